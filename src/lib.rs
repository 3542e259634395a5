pub mod aggregate;
pub mod cleaning;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod records;

pub use aggregate::{DailyAggregate, DailyPoint, EventSplit};
pub use config::LoaderConfig;
pub use diagnostics::{Diagnostics, Field, FieldIssues};
pub use error::{LoadError, SchemaError};
pub use orchestrator::{LoadOutcome, load, load_from_reader, load_many, run, write_rows};
pub use records::{CleanedRecord, RawRecord, SalesRecord};
