use crate::app::listings::listing_index;
use crate::domain::listing::{ListingDraft, ListingQuery, Page};
use crate::domain::user::Role;
use crate::transport::http::handlers::common::{fail, fail_with, ok, require_user};
use crate::transport::http::types::{ApiResponse, AppState, SearchParams};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

pub const MAX_PER_PAGE: u32 = 100;

#[utoipa::path(
    get,
    path = "/listings",
    params(
        ("category" = Option<String>, Query, description = "vehicles | real_estate"),
        ("subcategory" = Option<String>, Query, description = "e.g. suv, villa"),
        ("city" = Option<String>, Query, description = "Case-insensitive city"),
        ("min_price" = Option<u64>, Query, description = "Inclusive lower bound"),
        ("max_price" = Option<u64>, Query, description = "Inclusive upper bound"),
        ("sort" = Option<String>, Query, description = "newest | price_asc | price_desc"),
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("per_page" = Option<u32>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "One page of listings", body = ApiResponse)
    )
)]
pub async fn list_handler(State(state): State<AppState>, Query(query): Query<ListingQuery>) -> impl IntoResponse {
    let filters = query.filters();
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

    let store = state.store.read().await;
    let mut matching: Vec<_> = store
        .listings
        .iter()
        .filter(|l| filters.matches(l))
        .cloned()
        .collect();
    drop(store);
    filters.sort(&mut matching);

    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip((u64::from(page - 1) * u64::from(per_page)) as usize)
        .take(per_page as usize)
        .collect();

    ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

#[utoipa::path(
    get,
    path = "/listings/search",
    params(("q" = String, Query, description = "Fuzzy query, extended syntax allowed")),
    responses(
        (status = 200, description = "Best matches first (at most 10)", body = ApiResponse),
        (status = 500, description = "Index could not be built", body = ApiResponse)
    )
)]
pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let listings = state.store.read().await.listings.clone();
    let index = match listing_index(listings) {
        Ok(idx) => idx,
        Err(e) => return fail(StatusCode::INTERNAL_SERVER_ERROR, format!("index build failed: {}", e)),
    };
    let hits: Vec<_> = index
        .search(&params.q)
        .into_iter()
        .map(|hit| hit.item.clone())
        .collect();
    ok(hits)
}

#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing", body = ApiResponse),
        (status = 404, description = "No such listing", body = ApiResponse)
    )
)]
pub async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let store = state.store.read().await;
    match store.listings.iter().find(|l| l.id == id) {
        Some(listing) => ok(listing),
        None => fail(StatusCode::NOT_FOUND, format!("Listing '{}' not found", id)),
    }
}

#[utoipa::path(
    post,
    path = "/listings",
    request_body = ListingDraft,
    responses(
        (status = 200, description = "Listing created", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse)
    )
)]
pub async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<ListingDraft>, JsonRejection>,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let Json(draft) = match request {
        Ok(v) => v,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid JSON body: {}", e)),
    };
    if let Err(errors) = draft.validate() {
        return fail_with(StatusCode::BAD_REQUEST, "validation failed", errors);
    }

    let mut store = state.store.write().await;
    let id = store.next_id("l");
    let listing = draft.into_listing(id, user.id, Utc::now());
    store.listings.push(listing.clone());
    ok(listing)
}

#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    request_body = ListingDraft,
    responses(
        (status = 200, description = "Listing updated", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 403, description = "Not the owner", body = ApiResponse),
        (status = 404, description = "No such listing", body = ApiResponse)
    )
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<ListingDraft>, JsonRejection>,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let Json(draft) = match request {
        Ok(v) => v,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid JSON body: {}", e)),
    };
    if let Err(errors) = draft.validate() {
        return fail_with(StatusCode::BAD_REQUEST, "validation failed", errors);
    }

    let mut store = state.store.write().await;
    let Some(slot) = store.listings.iter_mut().find(|l| l.id == id) else {
        return fail(StatusCode::NOT_FOUND, format!("Listing '{}' not found", id));
    };
    if slot.owner_id != user.id && user.role != Role::Admin {
        return fail(StatusCode::FORBIDDEN, "only the owner can edit this listing");
    }
    let updated = draft.into_listing(slot.id.clone(), slot.owner_id.clone(), slot.created_at);
    *slot = updated.clone();
    ok(updated)
}

#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing deleted", body = ApiResponse),
        (status = 401, description = "No valid session", body = ApiResponse),
        (status = 403, description = "Not the owner", body = ApiResponse),
        (status = 404, description = "No such listing", body = ApiResponse)
    )
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user = match require_user(&state, &headers).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let mut store = state.store.write().await;
    let Some(pos) = store.listings.iter().position(|l| l.id == id) else {
        return fail(StatusCode::NOT_FOUND, format!("Listing '{}' not found", id));
    };
    if store.listings[pos].owner_id != user.id && user.role != Role::Admin {
        return fail(StatusCode::FORBIDDEN, "only the owner can delete this listing");
    }
    store.listings.remove(pos);
    ok(serde_json::json!({ "deleted": id }))
}
