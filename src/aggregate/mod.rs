pub mod daily;

pub use daily::{DailyAggregate, DailyPoint, EventSplit};
