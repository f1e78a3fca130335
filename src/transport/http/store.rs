//! In-memory backing store for the mock marketplace API, with demo seed data.

use crate::domain::listing::{
    Category, FuelType, Listing, ListingDetails, ListingImage, ListingLocation, ListingStatus,
    PropertyType, Transmission,
};
use crate::domain::message::{Conversation, Message};
use crate::domain::settings::UserSettings;
use crate::domain::user::{Role, User};
use chrono::{Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;

pub struct StoredUser {
    pub user: User,
    pub password: String,
}

#[derive(Default)]
pub struct MockStore {
    pub users: Vec<StoredUser>,
    /// session token -> user id
    pub sessions: HashMap<String, String>,
    /// refresh token -> user id
    pub refresh_tokens: HashMap<String, String>,
    pub listings: Vec<Listing>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
    pub settings: HashMap<String, UserSettings>,
    next_id: u64,
}

pub fn random_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl MockStore {
    pub fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    pub fn add_user(&mut self, user: User, password: &str) {
        self.users.push(StoredUser {
            user,
            password: password.to_string(),
        });
    }

    pub fn check_credentials(&self, email: &str, password: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.user.email.eq_ignore_ascii_case(email) && u.password == password)
            .map(|u| u.user.clone())
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.iter().find(|u| u.user.id == id).map(|u| u.user.clone())
    }

    pub fn user_for_session(&self, token: &str) -> Option<User> {
        self.sessions.get(token).and_then(|id| self.user(id))
    }

    /// Returns `(session_token, refresh_token)`.
    pub fn issue_tokens(&mut self, user_id: &str) -> (String, String) {
        let session = random_token();
        let refresh = random_token();
        self.sessions.insert(session.clone(), user_id.to_string());
        self.refresh_tokens.insert(refresh.clone(), user_id.to_string());
        (session, refresh)
    }

    /// Rotates a refresh token into a fresh token pair.
    pub fn rotate(&mut self, refresh_token: &str) -> Option<(String, String)> {
        let user_id = self.refresh_tokens.remove(refresh_token)?;
        Some(self.issue_tokens(&user_id))
    }

    pub fn revoke(&mut self, session: Option<&str>, refresh: Option<&str>) {
        if let Some(token) = session {
            self.sessions.remove(token);
        }
        if let Some(token) = refresh {
            self.refresh_tokens.remove(token);
        }
    }

    /// Three users, five listings across both verticals and one conversation.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        let now = Utc::now();

        store.add_user(
            User {
                id: "u1".to_string(),
                name: "Amira Haddad".to_string(),
                email: "amira@example.com".to_string(),
                role: Role::User,
                phone: Some("+966500000001".to_string()),
                avatar_url: None,
            },
            "password123",
        );
        store.add_user(
            User {
                id: "u2".to_string(),
                name: "Gulf Motors".to_string(),
                email: "dealer@example.com".to_string(),
                role: Role::Dealer,
                phone: Some("+966500000002".to_string()),
                avatar_url: None,
            },
            "password123",
        );
        store.add_user(
            User {
                id: "u3".to_string(),
                name: "Site Admin".to_string(),
                email: "admin@example.com".to_string(),
                role: Role::Admin,
                phone: None,
                avatar_url: None,
            },
            "password123",
        );

        let vehicle = |make: &str, model: &str, year: i32, km: u32, fuel: FuelType| {
            ListingDetails::Vehicle {
                make: make.to_string(),
                model: model.to_string(),
                year,
                mileage_km: km,
                fuel,
                transmission: Transmission::Automatic,
                features: vec!["bluetooth".to_string(), "rear camera".to_string()],
            }
        };
        let seeds: Vec<(&str, &str, u64, Category, &str, &str, ListingDetails, &str)> = vec![
            (
                "Toyota Land Cruiser 2019",
                "Single owner, agency maintained",
                185_000,
                Category::Vehicles,
                "suv",
                "Riyadh",
                vehicle("Toyota", "Land Cruiser", 2019, 82_000, FuelType::Petrol),
                "u2",
            ),
            (
                "Hyundai Sonata 2021",
                "Low mileage, warranty until 2026",
                72_000,
                Category::Vehicles,
                "sedan",
                "Jeddah",
                vehicle("Hyundai", "Sonata", 2021, 31_000, FuelType::Hybrid),
                "u2",
            ),
            (
                "Tesla Model 3 Long Range",
                "Autopilot, white interior",
                149_000,
                Category::Vehicles,
                "sedan",
                "Dammam",
                vehicle("Tesla", "Model 3", 2022, 18_000, FuelType::Electric),
                "u1",
            ),
            (
                "Modern villa with pool",
                "Five bedrooms, private garden, near schools",
                2_350_000,
                Category::RealEstate,
                "villa",
                "Riyadh",
                ListingDetails::RealEstate {
                    property_type: PropertyType::Villa,
                    bedrooms: 5,
                    bathrooms: 6,
                    area_sqm: 450,
                    furnished: false,
                    features: vec!["pool".to_string(), "garden".to_string()],
                },
                "u1",
            ),
            (
                "Furnished apartment in Al Olaya",
                "Two bedrooms, city view, gym access",
                65_000,
                Category::RealEstate,
                "apartment",
                "Riyadh",
                ListingDetails::RealEstate {
                    property_type: PropertyType::Apartment,
                    bedrooms: 2,
                    bathrooms: 2,
                    area_sqm: 120,
                    furnished: true,
                    features: vec!["gym".to_string(), "parking".to_string()],
                },
                "u1",
            ),
        ];

        for (n, (title, description, price, category, sub, city, details, owner)) in
            seeds.into_iter().enumerate()
        {
            let id = store.next_id("l");
            store.listings.push(Listing {
                id,
                title: title.to_string(),
                description: description.to_string(),
                price,
                currency: "SAR".to_string(),
                category,
                subcategory: sub.to_string(),
                location: ListingLocation {
                    city: city.to_string(),
                    district: None,
                },
                images: vec![ListingImage {
                    url: format!("https://cdn.example.com/listings/{}.jpg", n + 1),
                    caption: Some("front".to_string()),
                }],
                details,
                owner_id: owner.to_string(),
                status: ListingStatus::Active,
                created_at: now - Duration::hours(n as i64),
            });
        }

        let conversation_id = store.next_id("c");
        let message = Message {
            id: store.next_id("m"),
            conversation_id: conversation_id.clone(),
            sender_id: "u1".to_string(),
            body: "Is the Land Cruiser still available?".to_string(),
            sent_at: now,
        };
        store.conversations.push(Conversation {
            id: conversation_id,
            listing_id: "l1".to_string(),
            participant_ids: vec!["u1".to_string(), "u2".to_string()],
            last_message: Some(message.clone()),
            unread_count: 1,
        });
        store.messages.push(message);

        store
    }
}
