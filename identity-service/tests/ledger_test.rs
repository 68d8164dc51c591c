//! Refresh-token ledger semantics against a live PostgreSQL.
//!
//! Run with: cargo test -- --ignored

mod common;

use common::{live_state, unique_account};
use identity_service::models::{RefreshToken, User};

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn revocation_is_idempotent_and_scoped_to_one_token() {
    let state = live_state().await;
    let db = state.db;

    let (email, username) = unique_account();
    let user = User::new(email, username, "hash".to_string());
    db.insert_user(&user).await.unwrap();

    let first = RefreshToken::new(user.id, "raw-token-one", 30);
    let second = RefreshToken::new(user.id, "raw-token-two", 30);
    db.insert_refresh_token(&first).await.unwrap();
    db.insert_refresh_token(&second).await.unwrap();

    let active = db.find_active_refresh_tokens(user.id).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().any(|t| t.matches("raw-token-one")));

    // Revoke one; the other stays live.
    db.revoke_refresh_token(first.id).await.unwrap();
    let active = db.find_active_refresh_tokens(user.id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].matches("raw-token-two"));

    // Revoking again is a no-op, not an error.
    db.revoke_refresh_token(first.id).await.unwrap();

    // Bulk revoke reports how many were live.
    let revoked = db.revoke_all_refresh_tokens(user.id).await.unwrap();
    assert_eq!(revoked, 1);
    assert!(db.find_active_refresh_tokens(user.id).await.unwrap().is_empty());

    let revoked_again = db.revoke_all_refresh_tokens(user.id).await.unwrap();
    assert_eq!(revoked_again, 0);
}
