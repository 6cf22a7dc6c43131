//! Confirmation key test functions.

use chrono::Duration;

use crate::{EmailAddress, EmailBackend, EmailOwner};

use super::{TestContext, suite_config};

async fn added<C: TestContext>(ctx: &C, email: &str) -> (EmailAddress, String) {
    let owner = ctx.owner_create("daphne").await;
    added_for(ctx, &owner, email).await
}

async fn added_for<C: TestContext>(
    ctx: &C,
    owner: &<C::Backend as EmailBackend>::Owner,
    email: &str,
) -> (EmailAddress, String) {
    let address = ctx
        .confirmation()
        .registry()
        .add(owner, email)
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
    (address, key)
}

/// A valid key verifies the address, promotes it and notifies the hooks.
pub async fn consume_verifies_promotes_and_notifies<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let (address, key) = added(&ctx, "daphne@example.com").await;

    let confirmed = ctx
        .confirmation()
        .issuer()
        .consume(&key)
        .await
        .unwrap()
        .expect("address confirmed");

    assert_eq!(confirmed.id, address.id);
    assert!(confirmed.verified);
    assert!(confirmed.primary, "first confirmed address becomes primary");
    assert_eq!(ctx.hooks().confirmed(), vec![confirmed.clone()]);

    let stored = ctx
        .confirmation()
        .backend()
        .email_address_get_by_id(address.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, confirmed);
}

/// Confirming a second address leaves the existing primary in place.
pub async fn consume_keeps_existing_primary<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let first = ctx
        .email_address_insert(owner.id(), "other@example.com", true, true)
        .await;
    let (_address, key) = added_for(&ctx, &owner, "daphne@example.com").await;

    let confirmed = ctx
        .confirmation()
        .issuer()
        .consume(&key)
        .await
        .unwrap()
        .expect("address confirmed");

    assert!(confirmed.verified);
    assert!(!confirmed.primary);
    let first = ctx
        .confirmation()
        .backend()
        .email_address_get_by_id(first.id)
        .await
        .unwrap()
        .unwrap();
    assert!(first.primary);
}

/// Keys older than the window are rejected and change nothing.
pub async fn consume_rejects_expired_key<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let (address, key) = added(&ctx, "daphne@example.com").await;
    ctx.confirmation_token_backdate(&key, Duration::days(11))
        .await;

    let result = ctx.confirmation().issuer().consume(&key).await.unwrap();

    assert_eq!(result, None);
    let stored = ctx
        .confirmation()
        .backend()
        .email_address_get_by_id(address.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.verified);
    assert!(ctx.hooks().confirmed().is_empty());
}

/// A consumed key cannot confirm again.
pub async fn consume_cannot_be_replayed<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let (_address, key) = added(&ctx, "daphne@example.com").await;
    let issuer = ctx.confirmation().issuer();

    assert!(issuer.consume(&key).await.unwrap().is_some());
    assert_eq!(issuer.consume(&key).await.unwrap(), None);
    assert_eq!(ctx.hooks().confirmed().len(), 1);
}

/// The sweep deletes expired keys and keeps live ones.
pub async fn sweep_expired_removes_only_expired_keys<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let (stale, stale_key) = added_for(&ctx, &owner, "stale@example.com").await;
    let (fresh, fresh_key) = added_for(&ctx, &owner, "fresh@example.com").await;
    ctx.confirmation_token_backdate(&stale_key, Duration::days(11))
        .await;

    let removed = ctx.confirmation().issuer().sweep_expired().await.unwrap();

    assert_eq!(removed, 1);
    let backend = ctx.confirmation().backend();
    assert!(
        backend
            .confirmation_token_find_by_address(stale.id)
            .await
            .unwrap()
            .is_none()
    );
    let live = backend
        .confirmation_token_find_by_address(fresh.id)
        .await
        .unwrap()
        .expect("fresh key kept");
    assert_eq!(live.key, fresh_key);
}
