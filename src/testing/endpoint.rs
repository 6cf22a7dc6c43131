//! Confirmation endpoint test functions.

use reqwest::{StatusCode, header};

use crate::{ConfirmationConfig, EmailBackend};

use super::{TestContext, suite_config};

async fn issued_key<C: TestContext>(ctx: &C) -> (uuid::Uuid, String) {
    let owner = ctx.owner_create("daphne").await;
    let address = ctx
        .confirmation()
        .registry()
        .add(&owner, "daphne@example.com")
        .await
        .expect("add address")
        .expect("address created");
    let key = ctx
        .confirmation()
        .backend()
        .confirmation_token_find_by_address(address.id)
        .await
        .expect("db query")
        .expect("key issued")
        .key;
    (address.id, key)
}

fn confirm_url<C: TestContext>(base_url: &str, ctx: &C, key: &str) -> String {
    format!(
        "{}{}/{}/",
        base_url,
        ctx.confirmation().config().confirm_path,
        key
    )
}

async fn verified<C: TestContext>(ctx: &C, id: uuid::Uuid) -> bool {
    ctx.confirmation()
        .backend()
        .email_address_get_by_id(id)
        .await
        .expect("db query")
        .expect("address exists")
        .verified
}

/// Following the activation link confirms the address and says so.
pub async fn confirm_page_confirms_address<C: TestContext>() {
    let (base_url, client, ctx) = C::spawn(suite_config()).await;
    let (id, key) = issued_key(&ctx).await;

    let response = client
        .get(confirm_url(&base_url, &ctx, &key))
        .send()
        .await
        .expect("confirm request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("page body");
    assert!(body.contains("Confirmed daphne@example.com"));
    assert!(verified(&ctx, id).await);
}

/// Junk keys render the invalid-key page instead of an error.
pub async fn confirm_page_rejects_bad_key<C: TestContext>() {
    let (base_url, client, ctx) = C::spawn(suite_config()).await;

    let response = client
        .get(confirm_url(&base_url, &ctx, "junk"))
        .send()
        .await
        .expect("confirm request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("page body");
    assert!(body.contains("Invalid or expired key"));
    assert!(ctx.hooks().confirmed().is_empty());
}

/// Keys are matched regardless of case.
pub async fn confirm_page_lowercases_key<C: TestContext>() {
    let (base_url, client, ctx) = C::spawn(suite_config()).await;
    let (id, key) = issued_key(&ctx).await;

    let response = client
        .get(confirm_url(&base_url, &ctx, &key.to_uppercase()))
        .send()
        .await
        .expect("confirm request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("page body");
    assert!(body.contains("Confirmed daphne@example.com"));
    assert!(verified(&ctx, id).await);
}

/// With a success redirect configured, confirming redirects and leaves a notice.
pub async fn confirm_redirects_when_configured<C: TestContext>() {
    let config = ConfirmationConfig {
        success_redirect: Some("/profile".to_string()),
        ..suite_config()
    };
    let (base_url, client, ctx) = C::spawn(config).await;
    let (id, key) = issued_key(&ctx).await;

    let response = client
        .get(confirm_url(&base_url, &ctx, &key))
        .send()
        .await
        .expect("confirm request");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/profile")
    );
    let flash_cookie = format!("{}=", ctx.confirmation().config().flash_cookie_name);
    assert!(
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.starts_with(&flash_cookie)),
        "successful confirmation should leave a flash notice"
    );
    assert!(verified(&ctx, id).await);

    let replay = client
        .get(confirm_url(&base_url, &ctx, &key))
        .send()
        .await
        .expect("replayed confirm request");
    assert_eq!(replay.status(), StatusCode::OK, "failures never redirect");
    let body = replay.text().await.expect("page body");
    assert!(body.contains("Invalid or expired key"));
}
