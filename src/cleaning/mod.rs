pub mod cleaner;

pub use cleaner::{clean_price, clean_record, clean_quantity, normalize_header, parse_date, strip_numeric};
