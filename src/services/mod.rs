pub mod clock;
pub mod content_gate;
pub mod database;
pub mod entitlement;
pub mod ledger;
pub mod memory;
pub mod payment;
pub mod store;
pub mod watermark;
