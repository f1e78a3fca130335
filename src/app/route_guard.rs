//! Route guard: decides whether a protected page renders, redirects or keeps showing a
//! loading state while the session check is outstanding.

use crate::app::session_guard::{SessionGuard, SessionStatus};
use crate::domain::user::{Role, User};
use crate::infra::config::{ClientConfig, DEFAULT_LOGIN_PATH, DEFAULT_UNAUTHORIZED_PATH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the user was headed, kept so login can send them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub path: String,
    /// Query string without the leading `?`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Fragment without the leading `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Location {
    /// Splits `/path?query#hash`.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, Some(hash.to_string())),
            None => (href, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.filter(|q| !q.is_empty()),
            hash: hash.filter(|h| !h.is_empty()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{}", q)?;
        }
        if let Some(h) = &self.hash {
            write!(f, "#{}", h)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirements {
    /// Empty means any authenticated user.
    pub required_roles: Vec<Role>,
    pub login_path: String,
    pub unauthorized_path: String,
}

impl Default for RouteRequirements {
    fn default() -> Self {
        Self {
            required_roles: Vec::new(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
        }
    }
}

impl RouteRequirements {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            required_roles: Vec::new(),
            login_path: config.login_path.clone(),
            unauthorized_path: config.unauthorized_path.clone(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Render,
    /// `from` is set for login redirects so the user can be returned afterwards.
    Redirect { to: String, from: Option<Location> },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    requirements: RouteRequirements,
    state: GuardState,
    has_checked: bool,
    user: Option<User>,
}

impl RouteGuard {
    pub fn new(requirements: RouteRequirements) -> Self {
        Self {
            requirements,
            state: GuardState::Checking,
            has_checked: false,
            user: None,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn has_checked(&self) -> bool {
        self.has_checked
    }

    /// Records the outcome of an auth check. Only the first call moves out of `Checking`
    /// on its own; later calls keep the guard in sync with the session.
    pub fn complete_check(&mut self, authenticated: bool, user: Option<User>) {
        self.has_checked = true;
        if authenticated {
            self.state = GuardState::Authenticated;
            self.user = user;
        } else {
            self.state = GuardState::Unauthenticated;
            self.user = None;
        }
    }

    /// Applies a published session status. `Unknown` leaves the guard untouched.
    pub fn observe(&mut self, status: &SessionStatus) {
        match status {
            SessionStatus::Unknown => {}
            SessionStatus::Authenticated(user) => self.complete_check(true, Some(user.clone())),
            SessionStatus::Unauthenticated => self.complete_check(false, None),
        }
    }

    pub fn decision(&self, location: &Location) -> GuardDecision {
        if !self.has_checked || self.state == GuardState::Checking {
            return GuardDecision::Loading;
        }

        if !self.requirements.required_roles.is_empty() {
            let allowed = self
                .user
                .as_ref()
                .is_some_and(|u| self.requirements.required_roles.contains(&u.role));
            if !allowed {
                return GuardDecision::Redirect {
                    to: self.requirements.unauthorized_path.clone(),
                    from: None,
                };
            }
        }

        match self.state {
            GuardState::Authenticated => GuardDecision::Render,
            _ => GuardDecision::Redirect {
                to: self.requirements.login_path.clone(),
                from: Some(location.clone()),
            },
        }
    }

    /// Awaits the session check and returns the resulting decision.
    pub async fn resolve(&mut self, session: &SessionGuard, location: &Location) -> GuardDecision {
        let authenticated = session.is_authenticated().await;
        self.complete_check(authenticated, session.current_user());
        let decision = self.decision(location);
        tracing::debug!(path = %location, ?decision, "route guard resolved");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".to_string(),
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            role,
            phone: None,
            avatar_url: None,
        }
    }

    #[test]
    fn loading_until_first_check() {
        let guard = RouteGuard::new(RouteRequirements::default());
        assert_eq!(guard.decision(&Location::parse("/account")), GuardDecision::Loading);

        let mut guard = guard;
        guard.observe(&SessionStatus::Unknown);
        assert_eq!(guard.decision(&Location::parse("/account")), GuardDecision::Loading);
    }

    #[test]
    fn unauthenticated_redirects_with_origin() {
        let mut guard = RouteGuard::new(RouteRequirements::default());
        guard.complete_check(false, None);

        let from = Location::parse("/listings/new?category=vehicles#photos");
        assert_eq!(
            guard.decision(&from),
            GuardDecision::Redirect {
                to: "/login".to_string(),
                from: Some(from.clone()),
            }
        );
        assert_eq!(from.to_string(), "/listings/new?category=vehicles#photos");
    }

    #[test]
    fn renders_for_authenticated_user_without_roles() {
        let mut guard = RouteGuard::new(RouteRequirements::default());
        guard.complete_check(true, Some(user(Role::User)));
        assert_eq!(guard.decision(&Location::parse("/")), GuardDecision::Render);
    }

    #[test]
    fn role_gate() {
        let reqs = RouteRequirements::default().with_roles([Role::Admin, Role::Dealer]);

        let mut guard = RouteGuard::new(reqs.clone());
        guard.complete_check(true, Some(user(Role::Dealer)));
        assert_eq!(guard.decision(&Location::parse("/dealer")), GuardDecision::Render);

        let mut guard = RouteGuard::new(reqs.clone());
        guard.complete_check(true, Some(user(Role::User)));
        assert_eq!(
            guard.decision(&Location::parse("/dealer")),
            GuardDecision::Redirect {
                to: "/unauthorized".to_string(),
                from: None,
            }
        );

        let mut guard = RouteGuard::new(reqs);
        guard.complete_check(false, None);
        assert!(matches!(
            guard.decision(&Location::parse("/dealer")),
            GuardDecision::Redirect { to, .. } if to == "/unauthorized"
        ));
    }

    #[test]
    fn parses_locations() {
        let loc = Location::parse("/search?q=villa");
        assert_eq!(loc.path, "/search");
        assert_eq!(loc.query.as_deref(), Some("q=villa"));
        assert_eq!(loc.hash, None);
        assert_eq!(Location::parse("").path, "/");
    }
}
