//! Listing DTOs for the two marketplace verticals (vehicles, real estate).

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_IMAGES: usize = 20;
pub const OLDEST_VEHICLE_YEAR: i32 = 1950;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vehicles,
    RealEstate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    Pending,
    Sold,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    Villa,
    Land,
    Office,
    Shop,
}

/// Vertical-specific part of a listing. Must agree with the listing's `Category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingDetails {
    Vehicle {
        make: String,
        model: String,
        year: i32,
        mileage_km: u32,
        fuel: FuelType,
        transmission: Transmission,
        #[serde(default)]
        features: Vec<String>,
    },
    RealEstate {
        property_type: PropertyType,
        bedrooms: u8,
        bathrooms: u8,
        area_sqm: u32,
        furnished: bool,
        #[serde(default)]
        features: Vec<String>,
    },
}

impl ListingDetails {
    pub fn category(&self) -> Category {
        match self {
            ListingDetails::Vehicle { .. } => Category::Vehicles,
            ListingDetails::RealEstate { .. } => Category::RealEstate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingLocation {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    pub currency: String,
    pub category: Category,
    pub subcategory: String,
    pub location: ListingLocation,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    pub details: ListingDetails,
    pub owner_id: String,
    #[serde(default)]
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

/// What the create/edit form submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    pub currency: String,
    pub category: Category,
    pub subcategory: String,
    pub location: ListingLocation,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    pub details: ListingDetails,
}

/// A single failed check on a submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ListingDraft {
    /// Collects every failed check instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FieldError::new("title", "is required"));
        } else if title.chars().count() > MAX_TITLE_CHARS {
            errors.push(FieldError::new(
                "title",
                format!("must be at most {} characters", MAX_TITLE_CHARS),
            ));
        }
        if self.price == 0 {
            errors.push(FieldError::new("price", "must be greater than zero"));
        }
        if self.currency.trim().is_empty() {
            errors.push(FieldError::new("currency", "is required"));
        }
        if self.subcategory.trim().is_empty() {
            errors.push(FieldError::new("subcategory", "is required"));
        }
        if self.location.city.trim().is_empty() {
            errors.push(FieldError::new("location.city", "is required"));
        }
        if self.images.is_empty() {
            errors.push(FieldError::new("images", "at least one image is required"));
        } else if self.images.len() > MAX_IMAGES {
            errors.push(FieldError::new(
                "images",
                format!("at most {} images are allowed", MAX_IMAGES),
            ));
        }
        if self.images.iter().any(|img| img.url.trim().is_empty()) {
            errors.push(FieldError::new("images.url", "must not be empty"));
        }

        if self.details.category() != self.category {
            errors.push(FieldError::new("details", "do not match the listing category"));
        }
        match &self.details {
            ListingDetails::Vehicle {
                make, model, year, ..
            } => {
                if make.trim().is_empty() {
                    errors.push(FieldError::new("details.make", "is required"));
                }
                if model.trim().is_empty() {
                    errors.push(FieldError::new("details.model", "is required"));
                }
                let newest = Utc::now().year() + 1;
                if *year < OLDEST_VEHICLE_YEAR || *year > newest {
                    errors.push(FieldError::new(
                        "details.year",
                        format!("must be between {} and {}", OLDEST_VEHICLE_YEAR, newest),
                    ));
                }
            }
            ListingDetails::RealEstate { area_sqm, .. } => {
                if *area_sqm == 0 {
                    errors.push(FieldError::new("details.area_sqm", "must be greater than zero"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn into_listing(self, id: String, owner_id: String, created_at: DateTime<Utc>) -> Listing {
        Listing {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            price: self.price,
            currency: self.currency,
            category: self.category,
            subcategory: self.subcategory,
            location: self.location,
            images: self.images,
            details: self.details,
            owner_id,
            status: ListingStatus::Active,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Browse filters. Kept flat so it maps one-to-one onto query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListingFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ListingFilters {
    pub fn matches(&self, listing: &Listing) -> bool {
        if self.category.is_some_and(|c| c != listing.category) {
            return false;
        }
        if let Some(sub) = &self.subcategory {
            if !sub.eq_ignore_ascii_case(&listing.subcategory) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if city.to_lowercase() != listing.location.city.to_lowercase() {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        true
    }

    pub fn sort(&self, listings: &mut [Listing]) {
        match self.sort {
            SortOrder::Newest => listings.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::PriceAsc => listings.sort_by_key(|l| l.price),
            SortOrder::PriceDesc => listings.sort_by(|a, b| b.price.cmp(&a.price)),
        }
    }
}

/// Filters plus paging, as sent on `GET /listings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListingQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl ListingQuery {
    pub fn new(filters: &ListingFilters, page: u32, per_page: u32) -> Self {
        Self {
            category: filters.category,
            subcategory: filters.subcategory.clone(),
            city: filters.city.clone(),
            min_price: filters.min_price,
            max_price: filters.max_price,
            sort: filters.sort,
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn filters(&self) -> ListingFilters {
        ListingFilters {
            category: self.category,
            subcategory: self.subcategory.clone(),
            city: self.city.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            sort: self.sort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < self.total
    }
}
