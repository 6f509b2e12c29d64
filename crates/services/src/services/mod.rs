pub mod audit;
pub mod inventory;
pub mod permission;
pub mod stats;
pub mod transfer;
pub mod trash;
