//! # Dorm Catalog
//!
//! Browsable dormitory listings, loaded from `config/dorms.toml`.

use serde::{Deserialize, Serialize};

/// Who a dorm admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPolicy {
    Male,
    Female,
    Mixed,
}

/// A dormitory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dorm {
    /// Unique slug, e.g. "kaznu-abai-3"
    pub id: String,
    pub name: String,
    pub university: String,
    pub address: String,
    /// Monthly rent in whole KZT
    pub price_kzt: i64,
    pub gender_policy: GenderPolicy,
    pub room_types: Vec<String>,
    pub amenities: Vec<String>,
    /// Distance to campus in kilometers
    pub distance_km: f64,
    /// Listing confirmed by the platform
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub photos: Vec<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Dorm catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DormCatalog {
    pub dorms: Vec<Dorm>,
}

impl DormCatalog {
    pub fn new() -> Self {
        Self { dorms: Vec::new() }
    }

    /// Find a dorm by slug
    pub fn get(&self, id: &str) -> Option<&Dorm> {
        self.dorms.iter().find(|d| d.id == id)
    }

    /// Listings the platform has verified
    pub fn verified_dorms(&self) -> impl Iterator<Item = &Dorm> {
        self.dorms.iter().filter(|d| d.verified)
    }

    /// Load catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
