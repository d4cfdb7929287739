//! Session expiration engine.
//!
//! Pure computation of absolute expiry timestamps. Realm settings are the
//! baseline; a client attribute may shorten them and a session-level
//! override may shorten them further. Nothing here ever lengthens a
//! timeout.
//!
//! Max lifespan counts from the start of the session, idle timeout from its
//! last refresh (client sessions: their own `timestamp`). When the idle
//! expiry lies past the max lifespan, the max lifespan wins.

use kc_model::client::{
    CLIENT_OFFLINE_SESSION_IDLE_TIMEOUT, CLIENT_OFFLINE_SESSION_MAX_LIFESPAN,
    CLIENT_SESSION_IDLE_TIMEOUT, CLIENT_SESSION_MAX_LIFESPAN,
};
use kc_model::{AuthenticatedClientSession, Client, ExpirationOverrides, Realm, UserSession};
use tracing::warn;

/// Realm expiration defaults, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmExpiration {
    // === Online ===
    sso_idle_timeout: i64,
    sso_max_lifespan: i64,
    sso_idle_timeout_remember_me: i64,
    sso_max_lifespan_remember_me: i64,
    client_idle_timeout: i64,
    client_max_lifespan: i64,

    // === Offline ===
    offline_idle_timeout: i64,
    offline_max_lifespan_enabled: bool,
    offline_max_lifespan: i64,
    client_offline_idle_timeout: i64,
    client_offline_max_lifespan: i64,
}

impl From<&Realm> for RealmExpiration {
    fn from(realm: &Realm) -> Self {
        Self {
            sso_idle_timeout: realm.sso_session_idle_timeout.into(),
            sso_max_lifespan: realm.sso_session_max_lifespan.into(),
            sso_idle_timeout_remember_me: realm.sso_session_idle_timeout_remember_me.into(),
            sso_max_lifespan_remember_me: realm.sso_session_max_lifespan_remember_me.into(),
            client_idle_timeout: realm.client_session_idle_timeout.into(),
            client_max_lifespan: realm.client_session_max_lifespan.into(),
            offline_idle_timeout: realm.offline_session_idle_timeout.into(),
            offline_max_lifespan_enabled: realm.offline_session_max_lifespan_enabled,
            offline_max_lifespan: realm.offline_session_max_lifespan.into(),
            client_offline_idle_timeout: realm.client_offline_session_idle_timeout.into(),
            client_offline_max_lifespan: realm.client_offline_session_max_lifespan.into(),
        }
    }
}

impl RealmExpiration {
    fn session_idle(&self, offline: bool, remember_me: bool) -> i64 {
        if offline {
            self.offline_idle_timeout
        } else if remember_me && self.sso_idle_timeout_remember_me > 0 {
            self.sso_idle_timeout_remember_me
        } else {
            self.sso_idle_timeout
        }
    }

    fn session_max(&self, offline: bool, remember_me: bool) -> Option<i64> {
        if offline {
            self.offline_max_lifespan_enabled
                .then_some(self.offline_max_lifespan)
        } else if remember_me && self.sso_max_lifespan_remember_me > 0 {
            Some(self.sso_max_lifespan_remember_me)
        } else {
            Some(self.sso_max_lifespan)
        }
    }

    fn client_idle(&self, offline: bool, remember_me: bool) -> i64 {
        let own = if offline {
            self.client_offline_idle_timeout
        } else {
            self.client_idle_timeout
        };
        if own > 0 {
            own
        } else {
            self.session_idle(offline, remember_me)
        }
    }

    fn client_max(&self, offline: bool, remember_me: bool) -> Option<i64> {
        let session_max = self.session_max(offline, remember_me)?;
        let own = if offline {
            self.client_offline_max_lifespan
        } else {
            self.client_max_lifespan
        };
        Some(if own > 0 { own } else { session_max })
    }
}

/// Client-level expiration attributes, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientExpiration {
    idle_timeout: Option<i64>,
    max_lifespan: Option<i64>,
    offline_idle_timeout: Option<i64>,
    offline_max_lifespan: Option<i64>,
}

impl From<&Client> for ClientExpiration {
    fn from(client: &Client) -> Self {
        let positive = |name| client.attribute_seconds(name).filter(|v| *v > 0);
        Self {
            idle_timeout: positive(CLIENT_SESSION_IDLE_TIMEOUT),
            max_lifespan: positive(CLIENT_SESSION_MAX_LIFESPAN),
            offline_idle_timeout: positive(CLIENT_OFFLINE_SESSION_IDLE_TIMEOUT),
            offline_max_lifespan: positive(CLIENT_OFFLINE_SESSION_MAX_LIFESPAN),
        }
    }
}

impl ClientExpiration {
    const fn idle(&self, offline: bool) -> Option<i64> {
        if offline {
            self.offline_idle_timeout
        } else {
            self.idle_timeout
        }
    }

    const fn max(&self, offline: bool) -> Option<i64> {
        if offline {
            self.offline_max_lifespan
        } else {
            self.max_lifespan
        }
    }
}

/// Computed expiry of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    /// Absolute max-lifespan expiry, `None` when unlimited.
    pub max_lifespan_at: Option<i64>,
    /// Absolute idle expiry, never past `max_lifespan_at`.
    pub idle_at: i64,
}

impl Expiration {
    fn new(max_lifespan_at: Option<i64>, idle_at: i64) -> Self {
        Self {
            max_lifespan_at,
            idle_at: max_lifespan_at.map_or(idle_at, |max| idle_at.min(max)),
        }
    }

    /// The earlier of both expiries.
    #[must_use]
    pub const fn expires_at(&self) -> i64 {
        self.idle_at
    }
}

fn tightest(base: i64, overrides: [Option<i64>; 2]) -> i64 {
    overrides.into_iter().flatten().fold(base, i64::min)
}

/// Expiry of a user session.
#[must_use]
pub fn user_session(session: &UserSession, realm: &RealmExpiration) -> Expiration {
    let offline = session.offline;
    let overrides = &session.expiration_overrides;
    let (idle_override, max_override) = if offline {
        (
            overrides.offline_session_idle_timeout,
            overrides.offline_session_max_lifespan,
        )
    } else {
        (overrides.session_idle_timeout, overrides.session_max_lifespan)
    };

    let idle = tightest(realm.session_idle(offline, session.remember_me), [idle_override, None]);
    let max = realm
        .session_max(offline, session.remember_me)
        .map(|max| tightest(max, [max_override, None]))
        .or(max_override);

    Expiration::new(
        max.map(|m| session.started.saturating_add(m)),
        session.last_session_refresh.saturating_add(idle),
    )
}

/// Expiry of a client session owned by `parent`.
///
/// The result never lies past the parent's max lifespan.
#[must_use]
pub fn client_session(
    client_session: &AuthenticatedClientSession,
    parent: &UserSession,
    realm: &RealmExpiration,
    client: &ClientExpiration,
) -> Expiration {
    let offline = parent.offline;
    let overrides = &parent.expiration_overrides;
    let (idle_override, max_override) = if offline {
        (
            overrides.offline_client_idle_timeout,
            overrides.offline_client_max_lifespan,
        )
    } else {
        (overrides.client_idle_timeout, overrides.client_max_lifespan)
    };

    let idle = tightest(
        realm.client_idle(offline, parent.remember_me),
        [client.idle(offline), idle_override],
    );
    let max = realm
        .client_max(offline, parent.remember_me)
        .map(|max| tightest(max, [client.max(offline), max_override]))
        .or(max_override);

    let own_max = max.map(|m| client_session.started.saturating_add(m));
    let parent_max = user_session(parent, realm).max_lifespan_at;
    let max_lifespan_at = match (own_max, parent_max) {
        (Some(own), Some(parent)) => Some(own.min(parent)),
        (own, parent) => own.or(parent),
    };

    Expiration::new(max_lifespan_at, client_session.timestamp.saturating_add(idle))
}

/// Session-level override slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    /// Online session max lifespan.
    SessionMaxLifespan,
    /// Online session idle timeout.
    SessionIdleTimeout,
    /// Offline session max lifespan.
    OfflineSessionMaxLifespan,
    /// Offline session idle timeout.
    OfflineSessionIdleTimeout,
    /// Online client session max lifespan.
    ClientMaxLifespan,
    /// Online client session idle timeout.
    ClientIdleTimeout,
    /// Offline client session max lifespan.
    OfflineClientMaxLifespan,
    /// Offline client session idle timeout.
    OfflineClientIdleTimeout,
}

impl Override {
    const fn slot(self, overrides: &mut ExpirationOverrides) -> &mut Option<i64> {
        match self {
            Self::SessionMaxLifespan => &mut overrides.session_max_lifespan,
            Self::SessionIdleTimeout => &mut overrides.session_idle_timeout,
            Self::OfflineSessionMaxLifespan => &mut overrides.offline_session_max_lifespan,
            Self::OfflineSessionIdleTimeout => &mut overrides.offline_session_idle_timeout,
            Self::ClientMaxLifespan => &mut overrides.client_max_lifespan,
            Self::ClientIdleTimeout => &mut overrides.client_idle_timeout,
            Self::OfflineClientMaxLifespan => &mut overrides.offline_client_max_lifespan,
            Self::OfflineClientIdleTimeout => &mut overrides.offline_client_idle_timeout,
        }
    }
}

/// Sets an override unless that would loosen an existing one. Returns
/// whether the value was applied.
pub fn tighten(overrides: &mut ExpirationOverrides, which: Override, seconds: i64) -> bool {
    let slot = which.slot(overrides);
    match *slot {
        Some(current) if seconds > current => {
            warn!(
                ?which,
                current,
                requested = seconds,
                "rejected attempt to loosen session expiration override"
            );
            false
        }
        _ => {
            *slot = Some(seconds);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use uuid::Uuid;

    use super::*;

    fn realm() -> Realm {
        let mut realm = Realm::new("test").with_sso_session(1_800, 36_000);
        realm.offline_session_idle_timeout = 10_000;
        realm
    }

    fn session(offline: bool) -> UserSession {
        let mut session = UserSession::new(Uuid::now_v7(), Uuid::now_v7(), "alice", 1_000);
        session.offline = offline;
        session
    }

    #[test]
    fn realm_defaults_are_baseline() {
        let exp = user_session(&session(false), &RealmExpiration::from(&realm()));

        assert_eq!(exp.max_lifespan_at, Some(37_000));
        assert_eq!(exp.expires_at(), 2_800);
    }

    #[test]
    fn idle_counts_from_last_refresh() {
        let mut s = session(false);
        s.last_session_refresh = 5_000;

        let exp = user_session(&s, &RealmExpiration::from(&realm()));

        assert_eq!(exp.idle_at, 6_800);
    }

    #[test]
    fn max_lifespan_caps_idle() {
        let mut s = session(false);
        s.last_session_refresh = 36_500;

        let exp = user_session(&s, &RealmExpiration::from(&realm()));

        assert_eq!(exp.expires_at(), 37_000);
    }

    #[test]
    fn smaller_session_override_wins_larger_ignored() {
        let realm = RealmExpiration::from(&realm());
        let mut s = session(false);

        s.expiration_overrides.session_idle_timeout = Some(100);
        assert_eq!(user_session(&s, &realm).expires_at(), 1_100);

        s.expiration_overrides.session_idle_timeout = Some(5_000);
        assert_eq!(user_session(&s, &realm).expires_at(), 2_800);
    }

    #[test]
    fn offline_without_max_lifespan_is_idle_only() {
        let exp = user_session(&session(true), &RealmExpiration::from(&realm()));

        assert_eq!(exp.max_lifespan_at, None);
        assert_eq!(exp.expires_at(), 11_000);
    }

    #[test]
    fn remember_me_uses_its_own_settings() {
        let mut r = realm();
        r.sso_session_idle_timeout_remember_me = 7_200;
        let mut s = session(false);
        s.remember_me = true;

        let exp = user_session(&s, &RealmExpiration::from(&r));

        assert_eq!(exp.idle_at, 8_200);
    }

    #[test]
    fn client_attribute_then_session_override() {
        let realm_exp = RealmExpiration::from(&realm());
        let mut parent = session(false);
        let client_id = Uuid::now_v7();
        let cs = AuthenticatedClientSession::new(client_id, false, 1_000);

        let mut client = Client::new(Uuid::now_v7(), "app");
        assert_eq!(
            client_session(&cs, &parent, &realm_exp, &ClientExpiration::from(&client))
                .expires_at(),
            2_800
        );

        client.attributes = HashMap::from([(
            CLIENT_SESSION_IDLE_TIMEOUT.to_string(),
            "600".to_string(),
        )]);
        let client_exp = ClientExpiration::from(&client);
        assert_eq!(
            client_session(&cs, &parent, &realm_exp, &client_exp).expires_at(),
            1_600
        );

        parent.expiration_overrides.client_idle_timeout = Some(60);
        assert_eq!(
            client_session(&cs, &parent, &realm_exp, &client_exp).expires_at(),
            1_060
        );
    }

    #[test]
    fn client_session_bounded_by_parent_max() {
        let realm_exp = RealmExpiration::from(&realm());
        let parent = session(false);
        let mut cs = AuthenticatedClientSession::new(Uuid::now_v7(), false, 30_000);
        cs.timestamp = 36_900;

        let exp = client_session(&cs, &parent, &realm_exp, &ClientExpiration::default());

        assert_eq!(exp.expires_at(), 37_000);
    }

    #[test]
    fn offline_client_override_applies_without_realm_max() {
        let realm_exp = RealmExpiration::from(&realm());
        let mut parent = session(true);
        let cs = AuthenticatedClientSession::new(Uuid::now_v7(), true, 1_000);

        let unlimited = client_session(&cs, &parent, &realm_exp, &ClientExpiration::default());
        assert_eq!(unlimited.max_lifespan_at, None);

        parent.expiration_overrides.offline_client_max_lifespan = Some(50);
        let exp = client_session(&cs, &parent, &realm_exp, &ClientExpiration::default());

        assert_eq!(exp.max_lifespan_at, Some(1_050));
        assert_eq!(exp.expires_at(), 1_050);
    }

    #[test]
    fn override_only_tightens() {
        let mut overrides = ExpirationOverrides::default();

        assert!(tighten(&mut overrides, Override::SessionIdleTimeout, 100));
        assert!(!tighten(&mut overrides, Override::SessionIdleTimeout, 200));
        assert_eq!(overrides.session_idle_timeout, Some(100));

        assert!(tighten(&mut overrides, Override::SessionIdleTimeout, 50));
        assert_eq!(overrides.session_idle_timeout, Some(50));
    }
}
