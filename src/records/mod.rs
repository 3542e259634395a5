pub mod record;

pub use record::{CleanedRecord, RawRecord, SalesRecord, REQUIRED_COLUMNS};
