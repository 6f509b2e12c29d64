pub mod asset;
pub mod asset_transfer;
pub mod asset_type;
pub mod audit_log;
pub mod inventory;
pub mod maintenance_record;
pub mod permission;
pub mod role;
pub mod system_setting;
pub mod user;
