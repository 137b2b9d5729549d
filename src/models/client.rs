use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// A client record as persisted in the `clients` table.
///
/// The store assigns `id` on creation and maintains both timestamps on every
/// write. Wire keys are camelCase to match what the record-book frontend
/// sends and renders.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone_number: Option<i64>,
    pub note_number: Option<i64>,
    pub size: Option<Json<Measurements>>,
    pub orders_images: Option<Json<OrderImages>>,
    pub what_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One set of body measurements per client. The wire keys keep the Tigrinya
/// spellings from the tailor's measurement sheet, which the frontend renders
/// verbatim as labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(rename = "ወራዲ")]
    pub width: Option<f64>,
    #[serde(rename = "ቁመት")]
    pub length: Option<f64>,
    #[serde(rename = "ማዓንጣ")]
    pub waist: Option<f64>,
    #[serde(rename = "እፍልቢ")]
    pub chest: Option<f64>,
    #[serde(rename = "ሞንኮብ")]
    pub shoulder: Option<f64>,
    #[serde(rename = "ኢድ")]
    pub sleeve: Option<f64>,
}

/// Up to five opaque image references for a client's orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderImages {
    pub first: Option<String>,
    pub second: Option<String>,
    pub third: Option<String>,
    pub fourth: Option<String>,
    pub fifth: Option<String>,
}

/// Fields accepted when registering a client. `name` is the only required
/// field; the store rejects a missing or empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewClient {
    pub name: String,
    pub phone_number: Option<i64>,
    pub note_number: Option<i64>,
    pub size: Option<Measurements>,
    pub orders_images: Option<OrderImages>,
    pub what_type: Option<String>,
}

/// Partial update of a client. Only supplied fields overwrite the stored
/// record; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub phone_number: Option<i64>,
    pub note_number: Option<i64>,
    pub size: Option<Measurements>,
    pub orders_images: Option<OrderImages>,
    pub what_type: Option<String>,
}
