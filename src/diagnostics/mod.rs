pub mod report;

pub use report::{Diagnostics, Field, FieldIssues};
