pub mod approval;
pub mod change;
pub mod contract;
pub mod motorcycle;
pub mod repair;
