//! Mapping tables, report persistence and mutation audit

pub mod audit;
pub mod report;
pub mod store;

pub use audit::{checksum, MutationAuditEntry, Strategy};
pub use store::MappingStore;
