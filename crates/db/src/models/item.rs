//! Menu-item entity (collaborator of the job pipeline).

use serde::Serialize;
use sqlx::FromRow;

use mesa_core::types::{DbId, Timestamp};

/// A row from the `items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: DbId,
    pub restaurant_id: DbId,
    pub name: String,
    /// Primary listing photo (URL or stored path).
    pub image_url: Option<String>,
    /// Scanner captures, oldest first.
    pub scan_captures: Vec<String>,
    pub model_glb: Option<String>,
    pub model_usdz: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
