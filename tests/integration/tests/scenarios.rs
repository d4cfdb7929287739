//! The four reference scenarios, end to end.

use kc_core::config::AUTH_SESSIONS_LIMIT_KEY;
use kc_model::User;
use kc_model::session::notes::CORRESPONDING_SESSION_ID;
use kc_session::SessionOptions;
use kc_spi::MapConfig;
use uuid::Uuid;

use crate::common::TestEnv;

/// Offline twin: both sides point at each other and load on their own.
#[tokio::test]
async fn test_offline_twin_correspondence() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let sessions = request.user_sessions();
    let online = sessions
        .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
        .await?;
    assert!(!online.is_offline());
    let offline = sessions.create_offline_user_session(&online).await?;
    let (online_id, offline_id) = (online.id(), offline.id());
    assert_ne!(online_id, offline_id);
    request.commit().await?;

    let request = env.request()?;
    let sessions = request.user_sessions();
    let online = sessions
        .get_user_session(realm_id, online_id)
        .await?
        .expect("online session");
    let offline = sessions
        .get_offline_user_session(realm_id, offline_id)
        .await?
        .expect("offline session");

    assert_eq!(
        online.note(CORRESPONDING_SESSION_ID),
        Some(offline_id.to_string())
    );
    assert_eq!(
        offline.note(CORRESPONDING_SESSION_ID),
        Some(online_id.to_string())
    );
    assert!(offline.is_offline());
    Ok(())
}

/// Capacity eviction: the oldest tab goes when the root is full.
#[tokio::test]
async fn test_auth_session_eviction() -> anyhow::Result<()> {
    let env = TestEnv::with_config(MapConfig::new().with(AUTH_SESSIONS_LIMIT_KEY, "2")).await?;
    let (realm_id, client_id) = env.realm_with_client().await?;

    let request = env.request()?;
    let root = request
        .authentication_sessions()
        .create_root_authentication_session(realm_id, None)
        .await?;
    let t1 = root.create_authentication_session(client_id)?;
    env.clock.advance(1);
    let t2 = root.create_authentication_session(client_id)?;
    env.clock.advance(1);
    let t3 = root.create_authentication_session(client_id)?;
    let root_id = root.id();
    request.commit().await?;

    let request = env.request()?;
    let root = request
        .authentication_sessions()
        .get_root_authentication_session(realm_id, root_id)
        .await?
        .expect("root session");
    let tabs = root.authentication_sessions();

    assert_eq!(tabs.len(), 2);
    assert!(!tabs.contains_key(t1.tab_id()));
    assert!(tabs.contains_key(t2.tab_id()));
    assert!(tabs.contains_key(t3.tab_id()));
    Ok(())
}

/// Overrides only ever tighten.
#[tokio::test]
async fn test_override_monotonicity() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let session = request
        .user_sessions()
        .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
        .await?;
    assert!(session.set_session_idle_timeout_override(100)?);
    assert!(!session.set_session_idle_timeout_override(200)?);
    assert_eq!(session.expiration(), session.last_session_refresh() + 100);
    let id = session.id();
    request.commit().await?;

    let request = env.request()?;
    let session = request
        .user_sessions()
        .get_user_session(realm_id, id)
        .await?
        .expect("session within its idle window");
    assert_eq!(session.expiration_overrides().session_idle_timeout, Some(100));
    Ok(())
}

/// Cache hit, write invalidation, fresh read.
#[tokio::test]
async fn test_cache_interception() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let repo = env.repository();
    let realm_id = Uuid::now_v7();
    let user = User::new(realm_id, "alice");
    repo.create_user(&user).await?;

    let before_miss = env.keyspace.reads();
    let first = repo.get_user(realm_id, user.id).await?.expect("stored user");
    let after_miss = env.keyspace.reads();
    assert!(after_miss > before_miss);

    let second = repo.get_user(realm_id, user.id).await?.expect("cached user");
    assert_eq!(env.keyspace.reads(), after_miss);
    assert_eq!(second.username, first.username);
    assert_eq!(repo.cache().stats().hits, 1);

    let mut updated = first.clone();
    updated.first_name = Some("Alice".to_string());
    repo.update_user(&first, &updated).await?;

    let third = repo.get_user(realm_id, user.id).await?.expect("updated user");
    assert!(env.keyspace.reads() > after_miss);
    assert_eq!(third.first_name.as_deref(), Some("Alice"));
    Ok(())
}
