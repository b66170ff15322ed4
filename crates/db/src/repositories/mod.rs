use async_trait::async_trait;
use thiserror::Error;

use motodesk_core::domain::approval::{
    ApprovalRequest, ApprovalStatus, ApprovalType, RequestId,
};
use motodesk_core::domain::contract::{
    Contract, ContractId, ContractKind, ContractPatch, NewContract,
};
use motodesk_core::domain::motorcycle::{
    Motorcycle, MotorcycleId, MotorcyclePatch, NewMotorcycle,
};
use motodesk_core::domain::repair::{NewRepair, Repair, RepairId, RepairPatch};

pub mod approval;
pub mod contract;
pub mod motorcycle;
pub mod repair;

pub use approval::SqlApprovalStore;
pub use contract::SqlContractStore;
pub use motorcycle::SqlMotorcycleStore;
pub use repair::SqlRepairStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

pub(crate) fn decode_timestamp(value: &str) -> Result<chrono::DateTime<chrono::Utc>, RepositoryError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{value}`: {e}")))
}

pub(crate) fn decode_decimal(value: &str) -> Result<rust_decimal::Decimal, RepositoryError> {
    use std::str::FromStr;
    rust_decimal::Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("bad decimal `{value}`: {e}")))
}

pub(crate) fn decode_date(value: &str) -> Result<chrono::NaiveDate, RepositoryError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("bad date `{value}`: {e}")))
}

#[async_trait]
pub trait MotorcycleStore: Send + Sync {
    async fn create(&self, new: NewMotorcycle) -> Result<Motorcycle, RepositoryError>;
    async fn update(
        &self,
        id: &MotorcycleId,
        patch: MotorcyclePatch,
    ) -> Result<Option<Motorcycle>, RepositoryError>;
    async fn delete(&self, id: &MotorcycleId) -> Result<bool, RepositoryError>;
    async fn find_by_id(&self, id: &MotorcycleId) -> Result<Option<Motorcycle>, RepositoryError>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn create(
        &self,
        kind: ContractKind,
        new: NewContract,
    ) -> Result<Contract, RepositoryError>;
    async fn update(
        &self,
        id: &ContractId,
        patch: ContractPatch,
    ) -> Result<Option<Contract>, RepositoryError>;
    async fn delete(&self, id: &ContractId) -> Result<bool, RepositoryError>;
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError>;
}

#[async_trait]
pub trait RepairStore: Send + Sync {
    async fn create(&self, new: NewRepair) -> Result<Repair, RepositoryError>;
    async fn update(
        &self,
        id: &RepairId,
        patch: RepairPatch,
    ) -> Result<Option<Repair>, RepositoryError>;
    async fn delete(&self, id: &RepairId) -> Result<bool, RepositoryError>;
    async fn find_by_id(&self, id: &RepairId) -> Result<Option<Repair>, RepositoryError>;
}

/// Query filter for the approval audit surface. All fields are ANDed.
#[derive(Clone, Debug, Default)]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
    pub approval_type: Option<ApprovalType>,
    pub requested_by: Option<String>,
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &RequestId)
        -> Result<Option<ApprovalRequest>, RepositoryError>;
    async fn list(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    async fn count_with_status(&self, status: ApprovalStatus) -> Result<i64, RepositoryError>;
}
