use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotorcycleId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorcycleStatus {
    InStock,
    Sold,
    InRepair,
}

impl MotorcycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::Sold => "sold",
            Self::InRepair => "in_repair",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_stock" => Some(Self::InStock),
            "sold" => Some(Self::Sold),
            "in_repair" => Some(Self::InRepair),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motorcycle {
    pub id: MotorcycleId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub selling_price: Decimal,
    pub purchase_price: Option<Decimal>,
    pub status: MotorcycleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewMotorcycle {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub selling_price: Decimal,
    pub purchase_price: Option<Decimal>,
    pub status: MotorcycleStatus,
}

/// Partial update applied on approval; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorcyclePatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub selling_price: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
}

impl MotorcyclePatch {
    pub fn price_only(selling_price: Decimal) -> Self {
        Self { selling_price: Some(selling_price), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.vin.is_none()
            && self.selling_price.is_none()
            && self.purchase_price.is_none()
    }
}
