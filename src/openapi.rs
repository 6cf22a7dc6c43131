//! OpenAPI generation for the confirmation endpoint.

use std::path::{Path, PathBuf};

use crate::handlers;
use thiserror::Error;
use utoipa::OpenApi;

/// OpenAPI document for all public HTTP endpoints.
#[derive(OpenApi)]
#[openapi(
    nest(
        (
            path = handlers::EMAIL_CONFIRM_PATH,
            api = handlers::confirm::EmailConfirmApi,
            tags = ["email"]
        )
    ),
    tags((name = "email", description = "Email address confirmation"))
)]
pub struct EmailConfirmationApiDoc;

/// Failure to render or store the generated document.
#[derive(Debug, Error)]
pub enum OpenApiError {
    #[error("could not render openapi yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `path` is the directory that could not be created or the file that
    /// could not be written.
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The document for every route mounted by
/// [`EmailConfirmation::routes`](crate::EmailConfirmation::routes), assuming
/// the default confirm path.
pub fn openapi_build() -> utoipa::openapi::OpenApi {
    EmailConfirmationApiDoc::openapi()
}

/// Render [`openapi_build`] as YAML.
pub fn openapi_yaml_generate() -> Result<String, OpenApiError> {
    Ok(serde_yaml::to_string(&openapi_build())?)
}

/// Render the document and write it to `path`, creating parent directories.
pub fn openapi_yaml_write(path: impl AsRef<Path>) -> Result<(), OpenApiError> {
    let path = path.as_ref();
    let yaml = openapi_yaml_generate()?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| OpenApiError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, yaml).map_err(|source| OpenApiError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to `docs/openapi.yml` under the crate root and return that path.
pub fn openapi_yaml_write_default() -> Result<PathBuf, OpenApiError> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("docs/openapi.yml");
    openapi_yaml_write(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_yaml_generate_includes_confirm_path() {
        let yaml = openapi_yaml_generate().expect("openapi yaml");
        assert!(yaml.contains("/confirm/{key}/"));
        assert!(yaml.contains("ErrorResponse"));
    }

    #[test]
    fn openapi_yaml_write_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("openapi-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("openapi.yml");

        openapi_yaml_write(&path).expect("write openapi yaml");

        let written = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(written, openapi_yaml_generate().expect("openapi yaml"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn openapi_yaml_write_reports_unwritable_path() {
        let dir = std::env::temp_dir().join(format!("openapi-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");

        let result = openapi_yaml_write(&dir);

        assert!(matches!(result, Err(OpenApiError::Io { ref path, .. }) if path == &dir));
        std::fs::remove_dir_all(&dir).ok();
    }
}
