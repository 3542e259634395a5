use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use log::{debug, info, warn};

use crate::aggregate::DailyAggregate;
use crate::cleaning::{clean_record, normalize_header};
use crate::config::LoaderConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{LoadError, SchemaError};
use crate::records::{RawRecord, SalesRecord, REQUIRED_COLUMNS};

/// Result of a successful load. `rows` holds only usable rows; an empty
/// `rows`/`aggregate` is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub rows: Vec<SalesRecord>,
    pub aggregate: DailyAggregate,
    pub diagnostics: Diagnostics,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps rows matching `product` and `region` and re-aggregates them.
    /// Diagnostics still describe the full load.
    pub fn filter(&self, product: Option<&str>, region: Option<&str>) -> LoadOutcome {
        let mut rows: Vec<SalesRecord> = self
            .rows
            .iter()
            .filter(|r| r.matches(product, region))
            .cloned()
            .collect();
        let mut diagnostics = self.diagnostics.clone();
        let (aggregate, overflowed) = DailyAggregate::from_records(&mut rows);
        diagnostics.record_overflow(overflowed);
        LoadOutcome {
            rows,
            aggregate,
            diagnostics,
        }
    }
}

/// Column positions of the required fields, resolved from the header row.
struct ColumnMap {
    product: usize,
    price: usize,
    quantity: usize,
    date: usize,
    region: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, source_name: &str) -> Result<Self, SchemaError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            // First occurrence wins when two headers normalize to the same name.
            positions.entry(normalize_header(name)).or_insert(idx);
        }

        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !positions.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(SchemaError {
                source_name: source_name.to_string(),
                missing,
            });
        }

        Ok(Self {
            product: positions["product"],
            price: positions["price"],
            quantity: positions["quantity"],
            date: positions["date"],
            region: positions["region"],
        })
    }

    fn raw_record(&self, record: &StringRecord, row: usize) -> RawRecord {
        // Short rows read as blanks.
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        RawRecord {
            row,
            product: field(self.product),
            price: field(self.price),
            quantity: field(self.quantity),
            date: field(self.date),
            region: field(self.region),
        }
    }
}

/// Loads and cleans one CSV file.
pub fn load<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<LoadOutcome, LoadError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: name.clone(),
        source,
    })?;
    load_from_reader(file, &name, config)
}

/// Loads and cleans CSV content from any reader. `source_name` labels diagnostics and errors.
pub fn load_from_reader<R: Read>(
    reader: R,
    source_name: &str,
    config: &LoaderConfig,
) -> Result<LoadOutcome, LoadError> {
    info!("loading sales data from {}", source_name);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = ColumnMap::from_headers(rdr.headers()?, source_name)?;

    let mut diagnostics = Diagnostics::new(source_name, config.sample_size);
    let mut rows = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let cleaned = clean_record(columns.raw_record(&record, idx + 1));
        diagnostics.record(&cleaned);

        match cleaned.into_usable() {
            Some(sales) => rows.push(sales),
            None => debug!("{}: dropping row {}", source_name, idx + 1),
        }
    }

    let (aggregate, overflowed) = DailyAggregate::from_records(&mut rows);
    diagnostics.record_overflow(overflowed);
    info!(
        "{}: {} usable rows across {} dates",
        source_name,
        rows.len(),
        aggregate.len()
    );

    Ok(LoadOutcome {
        rows,
        aggregate,
        diagnostics,
    })
}

/// Loads each file independently, then concatenates rows in input order and
/// aggregates the combined set. The first structural error aborts the whole load.
pub fn load_many<P: AsRef<Path>>(paths: &[P], config: &LoaderConfig) -> Result<LoadOutcome, LoadError> {
    let mut rows = Vec::new();
    let mut diagnostics = Diagnostics::empty(config.sample_size);

    for path in paths {
        let outcome = load(path, config)?;
        rows.extend(outcome.rows);
        diagnostics.merge(outcome.diagnostics);
    }

    let (aggregate, overflowed) = DailyAggregate::from_records(&mut rows);
    diagnostics.record_overflow(overflowed);
    Ok(LoadOutcome {
        rows,
        aggregate,
        diagnostics,
    })
}

/// Writes usable rows as `product,price,quantity,date,region,sales`.
pub fn write_rows<W: io::Write>(rows: &[SalesRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Loads `paths`, applies the configured filters, reports diagnostics, and
/// writes the daily aggregate as CSV to `out`. Cleaned rows also go to
/// `config.rows_out` when set.
pub fn run<P, W>(paths: &[P], config: &LoaderConfig, out: W) -> Result<LoadOutcome, LoadError>
where
    P: AsRef<Path>,
    W: io::Write,
{
    let loaded = load_many(paths, config)?;
    loaded.diagnostics.log_summary();

    let outcome = loaded.filter(config.product.as_deref(), config.region.as_deref());
    if outcome.aggregate.is_empty() {
        warn!("no usable sales data after cleaning and filtering");
    }

    outcome.aggregate.write_csv(out).map_err(LoadError::Output)?;

    if let Some(path) = &config.rows_out {
        let file = File::create(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        write_rows(&outcome.rows, file).map_err(LoadError::Output)?;
        info!("wrote {} cleaned rows to {}", outcome.rows.len(), path.display());
    }

    match outcome.aggregate.split_at(config.event_date) {
        Some(split) => info!(
            "{} ({}): {} before, {} on or after",
            config.event_label, split.event_date, split.before, split.on_or_after
        ),
        None => warn!(
            "{} ({}): sales totals overflowed",
            config.event_label, config.event_date
        ),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const EXAMPLE: &str = "\
product,price,quantity,date,region
pink morsel,$3.00,2,2021-01-14,north
pink morsel,bad,5,2021-01-14,south
pink morsel,$3.50,4,2021-01-15,north
";

    fn decimal(amount: &str) -> Decimal {
        Decimal::from_str(amount).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn load_str(csv: &str) -> Result<LoadOutcome, LoadError> {
        load_from_reader(csv.as_bytes(), "test.csv", &LoaderConfig::default())
    }

    #[test]
    fn test_end_to_end_example() {
        let outcome = load_str(EXAMPLE).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].sales, decimal("6.00"));
        assert_eq!(outcome.rows[1].sales, decimal("14.00"));

        let points = outcome.aggregate.points();
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].date, points[0].sales), (date(14), decimal("6.00")));
        assert_eq!((points[1].date, points[1].sales), (date(15), decimal("14.00")));

        let diag = &outcome.diagnostics;
        assert_eq!(diag.total_rows, 3);
        assert_eq!(diag.dropped_rows, 1);
        assert_eq!(diag.price.invalid, 1);
        assert_eq!(diag.price.samples[0].region, "south");
    }

    #[test]
    fn test_headers_are_normalized() {
        let csv = " Product ,PRICE,Quantity,  Date,Region\npink morsel, $1.00 , 3 ,2021-01-14, east \n";
        let outcome = load_str(csv).unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].region, "east");
        assert_eq!(outcome.rows[0].sales, decimal("3.00"));
    }

    #[test]
    fn test_extra_columns_and_order_do_not_matter() {
        let csv = "region,date,id,quantity,price,product\nwest,2021-01-16,7,2,$2.25,pink morsel\n";
        let outcome = load_str(csv).unwrap();
        assert_eq!(outcome.rows[0].product, "pink morsel");
        assert_eq!(outcome.aggregate.get(date(16)), Some(decimal("4.50")));
    }

    #[test]
    fn test_missing_region_is_schema_error() {
        let csv = "product,price,quantity,date\npink morsel,$3.00,2,2021-01-14\n";
        match load_str(csv) {
            Err(LoadError::Schema(err)) => assert_eq!(err.missing, vec!["region".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_is_schema_error() {
        assert!(matches!(load_str(""), Err(LoadError::Schema(_))));
    }

    #[test]
    fn test_blank_price_dropped_but_not_invalid() {
        let csv = "product,price,quantity,date,region\npink morsel,,2,2021-01-14,north\npink morsel,abc,2,2021-01-14,north\n";
        let outcome = load_str(csv).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.diagnostics.price.invalid, 1);
        assert_eq!(outcome.diagnostics.price.blank, 1);
        assert_eq!(outcome.diagnostics.dropped_rows, 2);
    }

    #[test]
    fn test_short_rows_read_as_blank() {
        let csv = "product,price,quantity,date,region\npink morsel,$3.00\n";
        let outcome = load_str(csv).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.diagnostics.quantity.blank, 1);
        assert_eq!(outcome.diagnostics.date.blank, 1);
        assert_eq!(outcome.diagnostics.quantity.invalid, 0);
    }

    #[test]
    fn test_all_rows_dropped_is_still_ok() {
        let csv = "product,price,quantity,date,region\nx,bad,bad,bad,north\n";
        let outcome = load_str(csv).unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.aggregate.is_empty());
        assert_eq!(outcome.diagnostics.invalid_rows(), 3);
    }

    #[test]
    fn test_conservation_and_idempotence() {
        let first = load_str(EXAMPLE).unwrap();
        let second = load_str(EXAMPLE).unwrap();
        assert_eq!(first, second);

        let diag = &first.diagnostics;
        assert_eq!(diag.usable_rows + diag.dropped_rows, diag.total_rows);
        assert_eq!(diag.usable_rows, first.rows.len());
    }

    #[test]
    fn test_aggregate_matches_row_sums() {
        let csv = "\
product,price,quantity,date,region
a,$1.10,3,2021-01-14,north
b,$2.00,1,14/01/2021,south
c,$0.50,10,2021-01-13,east
";
        let outcome = load_str(csv).unwrap();
        for point in outcome.aggregate.points() {
            let expected: Decimal = outcome
                .rows
                .iter()
                .filter(|r| r.date == point.date)
                .map(|r| r.price * Decimal::from(r.quantity))
                .sum();
            assert_eq!(point.sales, expected);
        }
        assert_eq!(outcome.aggregate.get(date(14)), Some(decimal("5.30")));
    }

    #[test]
    fn test_filter_by_region_and_product() {
        let csv = "\
product,price,quantity,date,region
Pink Morsel,$3.00,2,2021-01-14,north
gold morsel,$9.00,1,2021-01-14,north
pink morsel,$1.00,1,2021-01-15,south
";
        let outcome = load_str(csv).unwrap();

        let north = outcome.filter(None, Some("North"));
        assert_eq!(north.rows.len(), 2);
        assert_eq!(north.aggregate.get(date(14)), Some(decimal("15.00")));

        let pink = outcome.filter(Some("pink morsel"), Some("all"));
        assert_eq!(pink.rows.len(), 2);
        assert_eq!(pink.aggregate.total(), Some(decimal("7.00")));

        let none = outcome.filter(Some("pink morsel"), Some("west"));
        assert!(none.is_empty());
        assert_eq!(none.diagnostics, outcome.diagnostics);
    }

    #[test]
    fn test_write_rows() {
        let outcome = load_str(EXAMPLE).unwrap();
        let mut out = Vec::new();
        write_rows(&outcome.rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("product,price,quantity,date,region,sales"));
        assert_eq!(lines.next(), Some("pink morsel,3.00,2,2021-01-14,north,6.00"));
    }

    const DECIMAL_MAX: &str = "79228162514264337593543950335";

    #[test]
    fn test_row_sales_overflow_is_dropped_not_invalid() {
        let csv = format!(
            "product,price,quantity,date,region\npink morsel,{},2,2021-01-14,north\npink morsel,$3.00,2,2021-01-14,north\n",
            DECIMAL_MAX
        );
        let outcome = load_str(&csv).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.aggregate.get(date(14)), Some(decimal("6.00")));

        let diag = &outcome.diagnostics;
        assert_eq!(diag.overflow_rows, 1);
        assert_eq!(diag.dropped_rows, 1);
        assert_eq!(diag.price.invalid, 0);
        assert_eq!(diag.quantity.invalid, 0);
        assert_eq!(diag.date.invalid, 0);
        assert_eq!(diag.usable_rows + diag.dropped_rows, diag.total_rows);
        assert!(diag.to_string().contains("overflowed sales: 1"));
    }

    #[test]
    fn test_daily_total_overflow_drops_row() {
        let csv = format!(
            "product,price,quantity,date,region\na,{max},1,2021-01-14,north\nb,{max},1,2021-01-14,south\n",
            max = DECIMAL_MAX
        );
        let outcome = load_str(&csv).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].product, "a");
        assert_eq!(outcome.aggregate.get(date(14)), Some(Decimal::MAX));

        let diag = &outcome.diagnostics;
        assert_eq!(diag.overflow_rows, 1);
        assert_eq!(diag.usable_rows, 1);
        assert_eq!(diag.dropped_rows, 1);
        assert_eq!(diag.usable_rows + diag.dropped_rows, diag.total_rows);
    }

    #[test]
    fn test_run_survives_overflowing_event_split() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        let csv = format!(
            "product,price,quantity,date,region\na,{max},1,2021-01-15,north\nb,{max},1,2021-01-16,north\n",
            max = DECIMAL_MAX
        );
        std::fs::write(&path, csv).unwrap();

        let mut out = Vec::new();
        let outcome = run(&[&path], &LoaderConfig::default(), &mut out).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.aggregate.split_at(date(15)), None);
        assert_eq!(outcome.aggregate.total(), None);
    }

    #[test]
    fn test_run_writes_rows_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sales.csv");
        let rows_out = dir.path().join("combined_output.csv");
        std::fs::write(&input, EXAMPLE).unwrap();

        let config = LoaderConfig {
            rows_out: Some(rows_out.clone()),
            ..LoaderConfig::default()
        };
        run(&[&input], &config, io::sink()).unwrap();

        let text = std::fs::read_to_string(&rows_out).unwrap();
        assert_eq!(
            text,
            "product,price,quantity,date,region,sales\n\
             pink morsel,3.00,2,2021-01-14,north,6.00\n\
             pink morsel,3.50,4,2021-01-15,north,14.00\n"
        );
    }

    #[test]
    fn test_run_writes_filtered_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        std::fs::write(&path, EXAMPLE).unwrap();

        let config = LoaderConfig {
            region: Some("north".to_string()),
            ..LoaderConfig::default()
        };
        let mut out = Vec::new();
        let outcome = run(&[&path], &config, &mut out).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,sales\n2021-01-14,6.00\n2021-01-15,14.00\n"
        );
    }
}
