//! Session guard: one await-able "is the user authenticated" / "refresh now" / "restore"
//! operation shared by any number of concurrent callers.
//!
//! Every failure (network, server, decode) resolves toward "not authenticated". Nothing
//! here returns an error to the caller.

use crate::app::single_flight::SingleFlight;
use crate::domain::user::{Credentials, User};
use crate::error::{ApiError, ApiResult};
use crate::infra::http::ApiClient;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Name of the HTTP-only cookie carrying the session.
pub const SESSION_COOKIE: &str = "session";

/// The auth endpoints the guard talks to.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Presence check only; the cookie value is never read.
    fn has_session_cookie(&self) -> bool;

    /// `GET /auth/me`
    async fn current_user(&self) -> ApiResult<User>;

    /// `POST /auth/refresh`
    async fn refresh(&self) -> ApiResult<()>;

    /// `POST /auth/logout`
    async fn logout(&self) -> ApiResult<()>;

    /// `POST /auth/login`
    async fn login(&self, credentials: &Credentials) -> ApiResult<User>;
}

/// `AuthApi` over the REST client.
pub struct HttpAuthApi {
    client: Arc<ApiClient>,
}

impl HttpAuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    fn has_session_cookie(&self) -> bool {
        self.client.has_cookie(SESSION_COOKIE)
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.client.get_json("/auth/me").await
    }

    async fn refresh(&self) -> ApiResult<()> {
        self.client.post_empty("/auth/refresh").await
    }

    async fn logout(&self) -> ApiResult<()> {
        let res = self.client.post_empty("/auth/logout").await;
        // The server clears the cookie on success; make sure it is gone locally either way.
        self.client.expire_cookie(SESSION_COOKIE);
        res
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        self.client.post_json("/auth/login", credentials).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No check has settled yet.
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    /// `redirect_to` is set when the user should be sent to the login page.
    LoggedOut { redirect_to: Option<String> },
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutMode {
    Redirect,
    Silent,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    login_path: String,
    status: watch::Sender<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
    check: SingleFlight<bool>,
    refresh: SingleFlight<bool>,
    restore: SingleFlight<bool>,
}

/// Cheap to clone; all clones share the same in-flight slots and state.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<Inner>,
}

impl SessionGuard {
    pub fn new(api: Arc<dyn AuthApi>, login_path: impl Into<String>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Unknown);
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(Inner {
                api,
                login_path: login_path.into(),
                status,
                events,
                check: SingleFlight::new("auth-check"),
                refresh: SingleFlight::new("auth-refresh"),
                restore: SingleFlight::new("session-restore"),
            }),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        match &*self.inner.status.borrow() {
            SessionStatus::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// Number of checks that actually reached the auth API (joins excluded).
    pub fn checks_started(&self) -> u64 {
        self.inner.check.started()
    }

    pub fn refreshes_started(&self) -> u64 {
        self.inner.refresh.started()
    }

    /// Cookie presence check followed by `GET /auth/me`. Concurrent callers share one check.
    pub async fn is_authenticated(&self) -> bool {
        let this = self.clone();
        self.inner
            .check
            .run(move || async move { this.check_now().await })
            .await
            .unwrap_or(false)
    }

    /// Single-flight `POST /auth/refresh`; `true` on success.
    pub async fn refresh_token(&self) -> bool {
        let this = self.clone();
        self.inner
            .refresh
            .run(move || async move { this.refresh_now().await })
            .await
            .unwrap_or(false)
    }

    /// Check (unless skipped), refresh, re-verify. On failure the session is cleared
    /// without a redirect, so later checks report "not authenticated" on their own.
    pub async fn try_restore_session(&self, skip_initial_check: bool) -> bool {
        let this = self.clone();
        self.inner
            .restore
            .run(move || async move { this.restore_now(skip_initial_check).await })
            .await
            .unwrap_or(false)
    }

    /// Runs `f`; a 401 gets exactly one refresh and one retry. Any other failure, a failed
    /// refresh or a failed retry logs the user out and yields `None`.
    pub async fn with_auth<T, F, Fut>(&self, mut f: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let err = match f().await {
            Ok(value) => return Some(value),
            Err(e) => e,
        };

        if !err.is_unauthorized() {
            tracing::warn!(error = %err, "authenticated call failed");
            self.logout(LogoutMode::Redirect).await;
            return None;
        }

        tracing::info!("authenticated call returned 401; refreshing session");
        if !self.refresh_token().await {
            self.logout(LogoutMode::Redirect).await;
            return None;
        }

        match f().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "retry after refresh failed");
                self.logout(LogoutMode::Redirect).await;
                None
            }
        }
    }

    /// Like `with_auth`, mapping a lost session to `ApiError::NotAuthenticated`.
    pub async fn require_auth<T, F, Fut>(&self, f: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.with_auth(f).await.ok_or(ApiError::NotAuthenticated)
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        let user = self.inner.api.login(credentials).await?;
        tracing::info!(user_id = %user.id, "logged in");
        self.inner
            .status
            .send_replace(SessionStatus::Authenticated(user.clone()));
        let _ = self.inner.events.send(SessionEvent::LoggedIn(user.clone()));
        Ok(user)
    }

    /// Best-effort server logout; local state is cleared regardless.
    pub async fn logout(&self, mode: LogoutMode) {
        if let Err(e) = self.inner.api.logout().await {
            tracing::warn!(error = %e, "logout request failed; clearing local session anyway");
        }
        self.inner.status.send_replace(SessionStatus::Unauthenticated);
        let redirect_to = match mode {
            LogoutMode::Redirect => Some(self.inner.login_path.clone()),
            LogoutMode::Silent => None,
        };
        let _ = self.inner.events.send(SessionEvent::LoggedOut { redirect_to });
    }

    async fn check_now(&self) -> bool {
        if !self.inner.api.has_session_cookie() {
            tracing::debug!("no session cookie; skipping auth round trip");
            self.inner.status.send_replace(SessionStatus::Unauthenticated);
            return false;
        }

        match self.inner.api.current_user().await {
            Ok(user) => {
                self.inner
                    .status
                    .send_replace(SessionStatus::Authenticated(user));
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "auth check failed");
                self.inner.status.send_replace(SessionStatus::Unauthenticated);
                false
            }
        }
    }

    async fn refresh_now(&self) -> bool {
        match self.inner.api.refresh().await {
            Ok(()) => {
                tracing::info!("session refreshed");
                let _ = self.inner.events.send(SessionEvent::Refreshed);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                false
            }
        }
    }

    async fn restore_now(&self, skip_initial_check: bool) -> bool {
        if !skip_initial_check && self.is_authenticated().await {
            return true;
        }
        if self.refresh_token().await && self.is_authenticated().await {
            tracing::info!("session restored");
            return true;
        }
        tracing::info!("session could not be restored");
        self.logout(LogoutMode::Silent).await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::Status {
            status,
            message: "test".to_string(),
        }
    }

    fn demo_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Amira".to_string(),
            email: "amira@example.com".to_string(),
            role: Role::User,
            phone: None,
            avatar_url: None,
        }
    }

    #[derive(Default)]
    struct FakeAuth {
        cookie: AtomicBool,
        me_ok: AtomicBool,
        refresh_ok: AtomicBool,
        me_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        logout_calls: AtomicUsize,
    }

    impl FakeAuth {
        fn new(cookie: bool, me_ok: bool, refresh_ok: bool) -> Arc<Self> {
            let fake = Self::default();
            fake.cookie.store(cookie, Ordering::SeqCst);
            fake.me_ok.store(me_ok, Ordering::SeqCst);
            fake.refresh_ok.store(refresh_ok, Ordering::SeqCst);
            Arc::new(fake)
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        fn has_session_cookie(&self) -> bool {
            self.cookie.load(Ordering::SeqCst)
        }

        async fn current_user(&self) -> ApiResult<User> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if self.me_ok.load(Ordering::SeqCst) {
                Ok(demo_user())
            } else {
                Err(status_error(StatusCode::UNAUTHORIZED))
            }
        }

        async fn refresh(&self) -> ApiResult<()> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if self.refresh_ok.load(Ordering::SeqCst) {
                // A good refresh makes the session valid again.
                self.me_ok.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(status_error(StatusCode::UNAUTHORIZED))
            }
        }

        async fn logout(&self) -> ApiResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.cookie.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn login(&self, _credentials: &Credentials) -> ApiResult<User> {
            self.cookie.store(true, Ordering::SeqCst);
            self.me_ok.store(true, Ordering::SeqCst);
            Ok(demo_user())
        }
    }

    fn guard(fake: &Arc<FakeAuth>) -> SessionGuard {
        SessionGuard::new(fake.clone(), "/login")
    }

    #[tokio::test]
    async fn concurrent_checks_share_one_round_trip() {
        let fake = FakeAuth::new(true, true, true);
        let guard = guard(&fake);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move { guard.is_authenticated().await }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }
        assert_eq!(fake.me_calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.checks_started(), 1);
        assert_eq!(guard.current_user(), Some(demo_user()));
    }

    #[tokio::test]
    async fn missing_cookie_skips_the_network() {
        let fake = FakeAuth::new(false, true, true);
        let guard = guard(&fake);

        assert!(!guard.is_authenticated().await);
        assert_eq!(fake.me_calls.load(Ordering::SeqCst), 0);
        assert_eq!(guard.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn with_auth_refreshes_once_and_retries_on_401() {
        let fake = FakeAuth::new(true, false, true);
        let guard = guard(&fake);
        let attempts = AtomicUsize::new(0);

        let out = guard
            .with_auth(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(status_error(StatusCode::UNAUTHORIZED))
                    } else {
                        Ok(5)
                    }
                }
            })
            .await;

        assert_eq!(out, Some(5));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.logout_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn with_auth_logs_out_when_refresh_fails() {
        let fake = FakeAuth::new(true, false, false);
        let guard = guard(&fake);
        let mut events = guard.events();
        let attempts = AtomicUsize::new(0);

        let out: Option<u32> = guard
            .with_auth(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(status_error(StatusCode::UNAUTHORIZED)) }
            })
            .await;

        assert_eq!(out, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(fake.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut {
                redirect_to: Some("/login".to_string())
            }
        );
        assert_eq!(guard.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn with_auth_stops_after_one_retry() {
        let fake = FakeAuth::new(true, false, true);
        let guard = guard(&fake);
        let mut events = guard.events();
        let attempts = AtomicUsize::new(0);

        let out: Option<u32> = guard
            .with_auth(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(status_error(StatusCode::UNAUTHORIZED)) }
            })
            .await;

        assert_eq!(out, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Refreshed);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut {
                redirect_to: Some("/login".to_string())
            }
        );
        assert_eq!(guard.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_check_does_not_block_later_checks() {
        let fake = FakeAuth::new(true, true, true);
        let guard = guard(&fake);

        let gave_up =
            tokio::time::timeout(Duration::from_millis(5), guard.is_authenticated()).await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(guard.is_authenticated().await);
        assert_eq!(fake.me_calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.checks_started(), 2);
    }

    #[tokio::test]
    async fn non_401_failure_logs_out_without_refreshing() {
        let fake = FakeAuth::new(true, true, true);
        let guard = guard(&fake);
        let attempts = AtomicUsize::new(0);

        let out: Option<u32> = guard
            .with_auth(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(status_error(StatusCode::INTERNAL_SERVER_ERROR)) }
            })
            .await;

        assert_eq!(out, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fake.logout_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let fake = FakeAuth::new(true, false, true);
        let guard = guard(&fake);
        let first = AtomicUsize::new(0);
        let second = AtomicUsize::new(0);

        let call = |counter: &AtomicUsize| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(status_error(StatusCode::UNAUTHORIZED))
                } else {
                    Ok(n)
                }
            }
        };
        let (a, b) = tokio::join!(
            guard.with_auth(|| call(&first)),
            guard.with_auth(|| call(&second))
        );

        assert_eq!(a, Some(1));
        assert_eq!(b, Some(1));
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_restore_clears_session_silently() {
        let fake = FakeAuth::new(true, false, false);
        let guard = guard(&fake);
        let mut events = guard.events();

        assert!(!guard.try_restore_session(false).await);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut { redirect_to: None }
        );
        assert!(!guard.is_authenticated().await);
        assert_eq!(guard.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn restore_refreshes_an_expired_session() {
        let fake = FakeAuth::new(true, false, true);
        let guard = guard(&fake);

        assert!(guard.try_restore_session(false).await);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.me_calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.current_user(), Some(demo_user()));
    }

    #[tokio::test]
    async fn restore_can_skip_the_initial_check() {
        let fake = FakeAuth::new(true, true, true);
        let guard = guard(&fake);

        assert!(guard.try_restore_session(true).await);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.me_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_publishes_the_user() {
        let fake = FakeAuth::new(false, false, false);
        let guard = guard(&fake);
        let mut status = guard.subscribe();

        let credentials = Credentials {
            email: "amira@example.com".to_string(),
            password: "password123".to_string(),
        };
        guard.login(&credentials).await.unwrap();

        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), SessionStatus::Authenticated(demo_user()));
        assert!(guard.is_authenticated().await);
    }
}
