//! Request-level unit of work: identity, flushing, rollback.

use std::sync::Arc;

use kc_spi::Flushable;
use uuid::Uuid;

use crate::common::TestEnv;

/// Repeated lookups in one request hand back the same adapter.
#[tokio::test]
async fn test_adapter_identity() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, client_id) = env.realm_with_client().await?;

    let request = env.request()?;
    let clients = request.clients();
    let by_id = clients
        .get_client_by_id(realm_id, client_id)
        .await?
        .expect("client");
    let again = clients
        .get_client_by_id(realm_id, client_id)
        .await?
        .expect("client");

    assert!(Arc::ptr_eq(&by_id, &again));
    request.commit().await?;
    Ok(())
}

/// A change is visible in the same request and written exactly once.
#[tokio::test]
async fn test_flush_idempotence() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let user = request.users().add_user(realm_id, None, "alice").await?;
    user.set_first_name(Some("Alice".to_string()))?;

    let seen = request
        .users()
        .get_user_by_id(realm_id, user.id())
        .await?
        .expect("user");
    assert_eq!(seen.entity().first_name.as_deref(), Some("Alice"));

    let repo = request.session().repository();
    assert!(user.flush(repo).await?);
    let writes = env.keyspace.writes();
    assert!(!user.flush(repo).await?);
    assert_eq!(env.keyspace.writes(), writes);

    request.commit().await?;
    assert_eq!(env.keyspace.writes(), writes);
    Ok(())
}

/// Rolled-back creations leave nothing behind.
#[tokio::test]
async fn test_rollback_undoes_creations() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let request = env.request()?;
    let realm = request.realms().create_realm(None, "doomed").await?;
    let user = request.users().add_user(realm.id(), None, "bob").await?;
    let (realm_id, user_id) = (realm.id(), user.id());
    request.rollback().await?;

    let request = env.request()?;
    assert!(request.realms().get_realm(realm_id).await?.is_none());
    assert!(request.realms().get_realm_by_name("doomed").await?.is_none());
    assert!(request.users().get_user_by_id(realm_id, user_id).await?.is_none());
    Ok(())
}

/// An ended request rejects further work.
#[tokio::test]
async fn test_ended_request_rejects_writes() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let user = request.users().add_user(realm_id, None, "carol").await?;
    request.commit().await?;

    assert!(request.commit().await.is_err());
    assert!(user.set_first_name(Some("Carol".to_string())).is_err());
    assert!(
        request
            .users()
            .add_user(realm_id, Some(Uuid::now_v7()), "dave")
            .await
            .is_err()
    );
    Ok(())
}

/// A failing store aborts commit; the request can still roll back.
#[tokio::test]
async fn test_commit_failure_leaves_request_open() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let user = request.users().add_user(realm_id, None, "erin").await?;
    user.set_first_name(Some("Erin".to_string()))?;
    let user_id = user.id();

    env.keyspace.set_unavailable(true);
    let err = request.commit().await.expect_err("store is down");
    assert!(err.is_store_failure());
    env.keyspace.set_unavailable(false);

    request.rollback().await?;
    let request = env.request()?;
    assert!(request.users().get_user_by_id(realm_id, user_id).await?.is_none());
    Ok(())
}
