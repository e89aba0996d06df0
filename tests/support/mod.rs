//! Shared test models.

use chrono::{DateTime, TimeZone, Utc};
use documap::Model;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub slug: String,
    pub name: String,
    pub age: u32,
    #[serde(with = "documap::datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Model for Contact {
    const COLLECTION: &'static str = "contacts";
    const SECONDARY_ID_KEY: &'static str = "slug";
}

pub fn contact(slug: &str, name: &str, age: u32) -> Contact {
    Contact {
        id: None,
        slug: slug.to_string(),
        name: name.to_string(),
        age,
        updated_at: Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 5).unwrap()
            + chrono::Duration::milliseconds(123),
    }
}

/// Serializes to a bare string, so encoding it as a field-map fails.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Opaque(pub String);

impl Model for Opaque {
    const COLLECTION: &'static str = "opaques";
    const SECONDARY_ID_KEY: &'static str = "name";
}
