pub mod listings;
pub mod messages;
pub mod route_guard;
pub mod session_guard;
pub mod settings;
pub mod single_flight;
