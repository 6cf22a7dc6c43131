//! Address registry test functions.

use crate::{EmailBackend, EmailOwner};

use super::{TestContext, suite_config};

/// `add` stores an unverified record, issues one key and mails it.
pub async fn add_creates_address_and_sends_confirmation<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;

    let address = ctx
        .confirmation()
        .registry()
        .add(&owner, "daphne@example.com")
        .await
        .expect("add address")
        .expect("address created");

    let stored = ctx
        .confirmation()
        .backend()
        .email_address_get_by_id(address.id)
        .await
        .expect("db query")
        .expect("address persisted");
    assert_eq!(stored, address);
    assert!(!stored.verified && !stored.primary);

    let token = ctx
        .confirmation()
        .backend()
        .confirmation_token_find_by_address(address.id)
        .await
        .expect("db query")
        .expect("confirmation key issued");
    assert_eq!(token.key, token.key.to_lowercase());

    let sent = ctx.outbox().messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "daphne@example.com");
    assert!(
        sent[0].body.contains(&token.key),
        "message should carry the activation link"
    );
}

/// A second `add` of the same address is a silent no-op.
pub async fn add_duplicate_returns_none_and_sends_nothing<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let registry = ctx.confirmation().registry();

    let first = registry.add(&owner, "daphne@example.com").await.unwrap();
    let second = registry.add(&owner, "daphne@example.com").await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    let stored = ctx
        .confirmation()
        .backend()
        .email_address_list_by_owner(owner.id())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(ctx.outbox().messages().len(), 1);
}

/// `primary` returns the one primary record, or nothing.
pub async fn primary_get_returns_single_primary<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let registry = ctx.confirmation().registry();

    ctx.email_address_insert(owner.id(), "other@example.com", false, false)
        .await;
    assert_eq!(registry.primary(owner.id()).await.unwrap(), None);

    let main = ctx
        .email_address_insert(owner.id(), "daphne@example.com", false, true)
        .await;
    assert_eq!(registry.primary(owner.id()).await.unwrap(), Some(main));
}

/// `owners_for` only reports owners whose record is verified.
pub async fn owners_for_excludes_unverified_records<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let daphne = ctx.owner_create("daphne").await;
    let scooby = ctx.owner_create("scooby").await;
    let fred = ctx.owner_create("fred").await;

    ctx.email_address_insert(daphne.id(), "mystery@example.com", true, false)
        .await;
    ctx.email_address_insert(scooby.id(), "mystery@example.com", true, false)
        .await;
    ctx.email_address_insert(fred.id(), "mystery@example.com", false, false)
        .await;

    let owners = ctx
        .confirmation()
        .registry()
        .owners_for("mystery@example.com")
        .await
        .unwrap();

    assert_eq!(owners.len(), 2);
    assert!(owners.contains(&daphne.id()));
    assert!(owners.contains(&scooby.id()));
    assert!(!owners.contains(&fred.id()));
}

/// Unconditional promotion replaces the primary and syncs the canonical email.
pub async fn promote_replaces_existing_primary<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let registry = ctx.confirmation().registry();
    let backend = ctx.confirmation().backend();

    let first = ctx
        .email_address_insert(owner.id(), "other@example.com", false, true)
        .await;
    let mut address = ctx
        .email_address_insert(owner.id(), "daphne@example.com", false, false)
        .await;

    assert!(registry.promote(&mut address, false).await.unwrap());
    assert!(address.primary);

    let first = backend
        .email_address_get_by_id(first.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!first.primary);

    let primaries = backend
        .email_address_list_by_owner(owner.id())
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.primary)
        .count();
    assert_eq!(primaries, 1, "an owner must never have two primaries");

    let owner = backend.owner_get_by_id(owner.id()).await.unwrap().unwrap();
    assert_eq!(owner.email(), "daphne@example.com");
}

/// Conditional promotion never replaces an existing primary.
pub async fn promote_conditional_keeps_existing_primary<C: TestContext>() {
    let (_base_url, _client, ctx) = C::spawn(suite_config()).await;
    let owner = ctx.owner_create("daphne").await;
    let registry = ctx.confirmation().registry();
    let backend = ctx.confirmation().backend();

    let mut first = ctx
        .email_address_insert(owner.id(), "other@example.com", false, false)
        .await;
    assert!(registry.promote(&mut first, true).await.unwrap());

    let mut address = ctx
        .email_address_insert(owner.id(), "daphne@example.com", false, false)
        .await;
    assert!(!registry.promote(&mut address, true).await.unwrap());
    assert!(!address.primary);

    let stored = backend
        .email_address_get_by_id(address.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.primary);
    assert_eq!(
        registry.primary(owner.id()).await.unwrap().map(|a| a.id),
        Some(first.id)
    );

    let owner = backend.owner_get_by_id(owner.id()).await.unwrap().unwrap();
    assert_eq!(owner.email(), "other@example.com");
}
