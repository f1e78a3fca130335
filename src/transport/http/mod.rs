//! Mock marketplace API: the backend contract the client core talks to, served
//! from an in-memory store so the client can be exercised end to end.

pub mod router;
pub mod store;
pub mod types;
pub mod handlers {
    pub mod auth;
    pub mod common;
    pub mod health;
    pub mod listings;
    pub mod messages;
    pub mod settings;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
