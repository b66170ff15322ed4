use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::motorcycle::MotorcycleId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepairId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Pending,
    /// Work details reviewed and registered; ready for completion.
    DetailsApproved,
    Completed,
}

impl RepairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DetailsApproved => "details_approved",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "details_approved" => Some(Self::DetailsApproved),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub id: RepairId,
    pub motorcycle_id: MotorcycleId,
    pub description: String,
    pub cost: Decimal,
    pub status: RepairStatus,
    pub details_registered: bool,
    pub completed_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewRepair {
    pub motorcycle_id: MotorcycleId,
    pub description: String,
    pub cost: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairPatch {
    pub description: Option<String>,
    pub cost: Option<Decimal>,
}

impl RepairPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.cost.is_none()
    }
}
