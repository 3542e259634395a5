pub mod orchestrator;

pub use orchestrator::{LoadOutcome, load, load_from_reader, load_many, run, write_rows};
