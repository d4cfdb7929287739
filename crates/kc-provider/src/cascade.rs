//! Session clean-up triggered by user and realm removal.
//!
//! Sessions are deleted through the repository and any adapter the request
//! holds for them is discarded, so a later commit cannot write them back.

use kc_spi::{KeycloakSession, kinds};
use kc_storage::StorageResult;
use tracing::debug;
use uuid::Uuid;

/// Deletes the online and offline sessions of a user.
pub(crate) async fn remove_user_sessions(
    session: &KeycloakSession,
    realm_id: Uuid,
    user_id: Uuid,
) -> StorageResult<usize> {
    let repo = session.repository();
    let mut removed = 0;
    for offline in [false, true] {
        for user_session in repo
            .find_user_sessions_by_user(realm_id, user_id, offline)
            .await?
        {
            session
                .registry()
                .remove(kinds::USER_SESSION, user_session.id);
            if repo.delete_user_session(&user_session).await? {
                removed += 1;
            }
        }
    }
    debug!(%realm_id, %user_id, removed, "user sessions removed");
    Ok(removed)
}

/// Deletes every user session and root authentication session of a realm.
pub(crate) async fn remove_realm_sessions(
    session: &KeycloakSession,
    realm_id: Uuid,
) -> StorageResult<()> {
    let repo = session.repository();
    for offline in [false, true] {
        for user_session in repo.find_user_sessions_by_realm(realm_id, offline).await? {
            session
                .registry()
                .remove(kinds::USER_SESSION, user_session.id);
            repo.delete_user_session(&user_session).await?;
        }
    }

    for root in repo.find_root_auth_sessions_by_realm(realm_id).await? {
        session.registry().remove(kinds::ROOT_AUTH_SESSION, root.id);
    }
    repo.delete_root_auth_sessions_by_realm(realm_id).await
}
