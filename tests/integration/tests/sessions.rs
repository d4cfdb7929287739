//! Session lifecycle across requests.

use kc_session::SessionOptions;
use uuid::Uuid;

use crate::common::TestEnv;

/// An idle session disappears once its idle window passes.
#[tokio::test]
async fn test_idle_session_expires() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let id = request
        .user_sessions()
        .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
        .await?
        .id();
    request.commit().await?;

    env.clock.advance(1_000);
    let request = env.request()?;
    let session = request
        .user_sessions()
        .get_user_session(realm_id, id)
        .await?
        .expect("still inside the idle window");
    session.set_last_session_refresh(env.clock.current_time())?;
    request.commit().await?;

    env.clock.advance(1_000);
    let request = env.request()?;
    assert!(
        request
            .user_sessions()
            .get_user_session(realm_id, id)
            .await?
            .is_some(),
        "refresh moved the idle deadline"
    );
    request.commit().await?;

    env.clock.advance(1_801);
    let request = env.request()?;
    assert!(
        request
            .user_sessions()
            .get_user_session(realm_id, id)
            .await?
            .is_none()
    );
    Ok(())
}

/// The offline twin outlives its online session.
#[tokio::test]
async fn test_offline_session_outlives_online() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, client_id) = env.realm_with_client().await?;

    let request = env.request()?;
    let sessions = request.user_sessions();
    let online = sessions
        .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
        .await?;
    let client_session = sessions.create_client_session(&online, client_id).await?;
    let offline = sessions.create_offline_user_session(&online).await?;
    sessions
        .create_offline_client_session(&client_session, &offline)
        .await?;
    let (online_id, offline_id) = (online.id(), offline.id());
    request.commit().await?;

    env.clock.advance(3_600);
    let request = env.request()?;
    let sessions = request.user_sessions();
    assert!(sessions.get_user_session(realm_id, online_id).await?.is_none());
    let offline = sessions
        .get_offline_user_session(realm_id, offline_id)
        .await?
        .expect("offline session");
    let clients = offline.authenticated_client_sessions().await?;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[&client_id].is_offline(), Some(true));
    Ok(())
}

/// Removing a session twice reports absence the second time.
#[tokio::test]
async fn test_second_delete_returns_false() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let sessions = request.user_sessions();
    let id = sessions
        .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
        .await?
        .id();

    assert!(sessions.remove_user_session(realm_id, id).await?);
    assert!(!sessions.remove_user_session(realm_id, id).await?);
    request.commit().await?;
    Ok(())
}

/// Users' sessions go with the user.
#[tokio::test]
async fn test_user_removal_removes_sessions() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, _) = env.realm_with_client().await?;

    let request = env.request()?;
    let user = request.users().add_user(realm_id, None, "alice").await?;
    let sessions = request.user_sessions();
    let online = sessions
        .create_user_session(realm_id, user.id(), "alice", SessionOptions::new())
        .await?;
    sessions.create_offline_user_session(&online).await?;
    let user_id = user.id();
    request.commit().await?;

    let request = env.request()?;
    assert!(request.users().remove_user(realm_id, user_id).await?);
    request.commit().await?;

    let request = env.request()?;
    let sessions = request.user_sessions();
    assert!(sessions.get_user_sessions(realm_id, user_id).await?.is_empty());
    assert!(
        sessions
            .get_offline_user_sessions(realm_id, user_id)
            .await?
            .is_empty()
    );
    Ok(())
}

/// Root authentication sessions expire after the realm's code lifespan.
#[tokio::test]
async fn test_auth_session_expires() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (realm_id, client_id) = env.realm_with_client().await?;

    let request = env.request()?;
    let root = request
        .authentication_sessions()
        .create_root_authentication_session(realm_id, None)
        .await?;
    let tab = root.create_authentication_session(client_id)?;
    tab.set_auth_note("nonce", "abc")?;
    let root_id = root.id();
    request.commit().await?;

    env.clock.advance(1_000);
    let request = env.request()?;
    let root = request
        .authentication_sessions()
        .get_root_authentication_session(realm_id, root_id)
        .await?
        .expect("inside the lifespan");
    let tab = root
        .get_authentication_session(client_id, tab.tab_id())
        .expect("tab");
    assert_eq!(tab.auth_note("nonce").as_deref(), Some("abc"));
    request.commit().await?;

    env.clock.advance(1_801);
    let request = env.request()?;
    assert!(
        request
            .authentication_sessions()
            .get_root_authentication_session(realm_id, root_id)
            .await?
            .is_none()
    );
    Ok(())
}
