pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::listings::{ListingFeed, ListingsService, LiveFeed};
pub use app::messages::MessagesService;
pub use app::route_guard::{GuardDecision, Location, RouteGuard, RouteRequirements};
pub use app::session_guard::{AuthApi, HttpAuthApi, LogoutMode, SessionEvent, SessionGuard, SessionStatus};
pub use app::settings::SettingsService;
pub use domain::search::{SearchIndex, SearchOptions};
pub use error::{ApiError, ApiResult};
pub use infra::config::ClientConfig;
pub use infra::http::ApiClient;
pub use infra::server_status::{ServerStatus, ServerStatusManager};
