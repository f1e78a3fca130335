//! Marketplace data types and the pure logic attached to them.

pub mod listing;
pub mod message;
pub mod notification;
pub mod search;
pub mod settings;
pub mod user;

pub use listing::{Category, FieldError, Listing, ListingDetails, ListingDraft, ListingFilters, Page};
pub use search::{SearchHit, SearchIndex, SearchKey, SearchOptions};
pub use user::{Role, User};
