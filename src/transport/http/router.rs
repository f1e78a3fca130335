use crate::domain::listing::{
    Category, FuelType, ListingDetails, ListingDraft, ListingImage, ListingLocation, PropertyType,
    Transmission,
};
use crate::transport::http::handlers::{auth, health, listings, messages, settings};
use crate::transport::http::types::{
    ApiResponse, AppState, LoginRequest, SendMessageRequest, SettingsUpdateRequest,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::me_handler,
        auth::logout_handler,
        listings::list_handler,
        listings::search_handler,
        listings::get_handler,
        listings::create_handler,
        listings::update_handler,
        listings::delete_handler,
        messages::conversations_handler,
        messages::messages_handler,
        messages::send_handler,
        settings::get_settings_handler,
        settings::update_settings_handler
    ),
    components(schemas(
        ApiResponse,
        LoginRequest,
        SendMessageRequest,
        SettingsUpdateRequest,
        ListingDraft,
        ListingDetails,
        ListingLocation,
        ListingImage,
        Category,
        FuelType,
        Transmission,
        PropertyType
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/listings",
            get(listings::list_handler).post(listings::create_handler),
        )
        .route("/listings/search", get(listings::search_handler))
        .route(
            "/listings/:id",
            get(listings::get_handler)
                .put(listings::update_handler)
                .delete(listings::delete_handler),
        )
        .route("/conversations", get(messages::conversations_handler))
        .route(
            "/conversations/:id/messages",
            get(messages::messages_handler).post(messages::send_handler),
        )
        .route(
            "/settings",
            get(settings::get_settings_handler).patch(settings::update_settings_handler),
        )
        .with_state(app_state)
}
