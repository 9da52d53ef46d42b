//! Catalog loading: request files, the allocated-time log, and the
//! resumable done ledger.

pub mod allocation;
pub mod ledger;
pub mod requests;

pub use allocation::load_allocations;
pub use ledger::seed_from_ledger;
pub use requests::load_catalog;
