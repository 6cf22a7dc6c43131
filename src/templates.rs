//! Rendering of confirmation messages and the confirmation page.
//!
//! Implement [`ConfirmationTemplates`] to use your own wording or template
//! engine. [`DefaultTemplates`] ships plain-text defaults built with askama.

use askama::Template;
use serde::Serialize;
use uuid::Uuid;

/// The named templates rendered when a confirmation is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationTemplate {
    /// Message subject. Line breaks are stripped after rendering.
    Subject,
    /// Message body.
    Message,
}

impl ConfirmationTemplate {
    /// Template name, for engines that look templates up by file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "email_confirmation_subject.txt",
            Self::Message => "email_confirmation_message.txt",
        }
    }
}

/// Values available to both confirmation templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationContext {
    /// ID of the user who added the address.
    pub owner_id: Uuid,
    /// Display name of that user.
    pub owner: String,
    /// Link that confirms the address.
    pub activate_url: String,
    /// Host of the current site.
    pub site_domain: String,
    /// Name of the current site.
    pub site_name: String,
    /// The raw confirmation key.
    pub key: String,
}

/// Template rendering failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to render {template}: {message}")]
pub struct TemplateError {
    /// Name of the template that failed.
    pub template: &'static str,
    /// Engine error message.
    pub message: String,
}

/// Renders confirmation messages.
pub trait ConfirmationTemplates: Send + Sync + Clone + 'static {
    /// Render one of the named templates with the given context.
    fn render(
        &self,
        template: ConfirmationTemplate,
        context: &ConfirmationContext,
    ) -> Result<String, TemplateError>;
}

/// Built-in plain-text templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplates;

#[derive(Template)]
#[template(source = "[{{ site_name }}] Confirm E-mail Address", ext = "txt")]
struct SubjectTemplate<'a> {
    site_name: &'a str,
}

#[derive(Template)]
#[template(
    source = "User {{ owner }} at {{ site_name }} has given this as an email address.

To confirm this is correct, go to {{ activate_url }}
",
    ext = "txt"
)]
struct MessageTemplate<'a> {
    owner: &'a str,
    site_name: &'a str,
    activate_url: &'a str,
}

impl ConfirmationTemplates for DefaultTemplates {
    fn render(
        &self,
        template: ConfirmationTemplate,
        context: &ConfirmationContext,
    ) -> Result<String, TemplateError> {
        let rendered = match template {
            ConfirmationTemplate::Subject => SubjectTemplate {
                site_name: &context.site_name,
            }
            .render(),
            ConfirmationTemplate::Message => MessageTemplate {
                owner: &context.owner,
                site_name: &context.site_name,
                activate_url: &context.activate_url,
            }
            .render(),
        };

        rendered.map_err(|e| TemplateError {
            template: template.as_str(),
            message: e.to_string(),
        })
    }
}

/// HTML page shown after following an activation link.
#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html>
<head><title>{% if confirmed %}Email address confirmed{% else %}Invalid or expired key{% endif %}</title></head>
<body>
{% if confirmed %}
<h1>Confirmed {{ email }}</h1>
<p>You have confirmed that {{ email }} is an email address for your account.</p>
{% else %}
<h1>Invalid or expired key</h1>
<p>This confirmation link is invalid or has expired. Please request a new confirmation email.</p>
{% endif %}
</body>
</html>
"#,
    ext = "html"
)]
pub(crate) struct ConfirmPage<'a> {
    pub confirmed: bool,
    pub email: &'a str,
}

/// Collapse a rendered subject onto a single line.
pub(crate) fn subject_single_line(subject: &str) -> String {
    subject.lines().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ConfirmationContext {
        ConfirmationContext {
            owner_id: Uuid::new_v4(),
            owner: "daphne".to_string(),
            activate_url: "http://example.com/confirm/abc/".to_string(),
            site_domain: "example.com".to_string(),
            site_name: "Example".to_string(),
            key: "abc".to_string(),
        }
    }

    #[test]
    fn default_message_contains_activate_url() {
        let body = DefaultTemplates
            .render(ConfirmationTemplate::Message, &context())
            .unwrap();
        assert!(body.contains("http://example.com/confirm/abc/"));
        assert!(body.contains("User daphne at Example"));
    }

    #[test]
    fn default_subject_names_site() {
        let subject = DefaultTemplates
            .render(ConfirmationTemplate::Subject, &context())
            .unwrap();
        assert_eq!(subject, "[Example] Confirm E-mail Address");
    }

    #[test]
    fn subject_line_breaks_are_removed() {
        assert_eq!(subject_single_line("Confirm\nyour\r\naddress\n"), "Confirmyouraddress");
    }

    #[test]
    fn confirm_page_escapes_email() {
        let html = ConfirmPage {
            confirmed: true,
            email: "<b>@example.com",
        }
        .render()
        .unwrap();
        assert!(html.contains("Confirmed &lt;b&gt;@example.com"));
    }

    #[test]
    fn confirm_page_reports_invalid_key() {
        let html = ConfirmPage {
            confirmed: false,
            email: "",
        }
        .render()
        .unwrap();
        assert!(html.contains("Invalid or expired key"));
    }
}
