use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::motorcycle::MotorcycleId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Sales,
    Purchase,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Purchase => "purchase",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub kind: ContractKind,
    pub motorcycle_id: MotorcycleId,
    /// Counterparty identifier: customer for sales, supplier for purchase.
    pub party: String,
    pub amount: Decimal,
    pub signed_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewContract {
    pub motorcycle_id: MotorcycleId,
    pub party: String,
    pub amount: Decimal,
    pub signed_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractPatch {
    pub party: Option<String>,
    pub amount: Option<Decimal>,
    pub signed_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ContractPatch {
    pub fn is_empty(&self) -> bool {
        self.party.is_none()
            && self.amount.is_none()
            && self.signed_on.is_none()
            && self.notes.is_none()
    }
}
