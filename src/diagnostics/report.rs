use std::fmt;

use log::{info, warn};

use crate::records::{CleanedRecord, RawRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Price,
    Quantity,
    Date,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Price, Field::Quantity, Field::Date];

    pub fn name(self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::Quantity => "quantity",
            Field::Date => "date",
        }
    }
}

/// Per-field tally. `invalid` counts non-blank values that failed to parse;
/// `blank` counts values that were empty to begin with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIssues {
    pub invalid: usize,
    pub blank: usize,
    pub samples: Vec<RawRecord>,
}

/// Non-fatal data-quality report for one or more loaded sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub sources: Vec<String>,
    pub sample_size: usize,
    pub total_rows: usize,
    pub usable_rows: usize,
    pub dropped_rows: usize,
    /// Rows with every field valid whose sales, or whose day's sales total, overflowed.
    pub overflow_rows: usize,
    pub price: FieldIssues,
    pub quantity: FieldIssues,
    pub date: FieldIssues,
}

impl Diagnostics {
    pub fn new(source: &str, sample_size: usize) -> Self {
        let mut diagnostics = Self::empty(sample_size);
        diagnostics.sources.push(source.to_string());
        diagnostics
    }

    /// A report covering no sources yet, for folding several loads together.
    pub fn empty(sample_size: usize) -> Self {
        Self {
            sources: Vec::new(),
            sample_size,
            total_rows: 0,
            usable_rows: 0,
            dropped_rows: 0,
            overflow_rows: 0,
            price: FieldIssues::default(),
            quantity: FieldIssues::default(),
            date: FieldIssues::default(),
        }
    }

    pub fn issues(&self, field: Field) -> &FieldIssues {
        match field {
            Field::Price => &self.price,
            Field::Quantity => &self.quantity,
            Field::Date => &self.date,
        }
    }

    fn issues_mut(&mut self, field: Field) -> &mut FieldIssues {
        match field {
            Field::Price => &mut self.price,
            Field::Quantity => &mut self.quantity,
            Field::Date => &mut self.date,
        }
    }

    /// Tally one cleaned row: blank/invalid per field, then usable or dropped.
    pub fn record(&mut self, cleaned: &CleanedRecord) {
        self.total_rows += 1;

        let raw = &cleaned.raw;
        let checks = [
            (Field::Price, raw.price.as_str(), cleaned.price.is_some()),
            (Field::Quantity, raw.quantity.as_str(), cleaned.quantity.is_some()),
            (Field::Date, raw.date.as_str(), cleaned.date.is_some()),
        ];
        for (field, original, parsed) in checks {
            if original.is_empty() {
                self.issues_mut(field).blank += 1;
            } else if !parsed {
                self.record_invalid(field, raw);
            }
        }

        if cleaned.is_usable() {
            self.usable_rows += 1;
        } else {
            self.dropped_rows += 1;
            if cleaned.price.is_some() && cleaned.quantity.is_some() && cleaned.date.is_some() {
                self.overflow_rows += 1;
            }
        }
    }

    fn record_invalid(&mut self, field: Field, raw: &RawRecord) {
        let sample_size = self.sample_size;
        let issues = self.issues_mut(field);
        issues.invalid += 1;
        if issues.samples.len() < sample_size {
            issues.samples.push(raw.clone());
        }
    }

    /// Moves `count` usable rows to dropped after their day's sales total overflowed.
    pub fn record_overflow(&mut self, count: usize) {
        let count = count.min(self.usable_rows);
        self.usable_rows -= count;
        self.dropped_rows += count;
        self.overflow_rows += count;
    }

    /// Folds another report into this one. Samples stay capped at `sample_size`.
    pub fn merge(&mut self, other: Diagnostics) {
        let Diagnostics {
            sources,
            total_rows,
            usable_rows,
            dropped_rows,
            overflow_rows,
            price,
            quantity,
            date,
            ..
        } = other;
        self.sources.extend(sources);
        self.total_rows += total_rows;
        self.usable_rows += usable_rows;
        self.dropped_rows += dropped_rows;
        self.overflow_rows += overflow_rows;

        for (field, theirs) in [(Field::Price, price), (Field::Quantity, quantity), (Field::Date, date)] {
            let sample_size = self.sample_size;
            let ours = self.issues_mut(field);
            ours.invalid += theirs.invalid;
            ours.blank += theirs.blank;
            let room = sample_size.saturating_sub(ours.samples.len());
            ours.samples.extend(theirs.samples.into_iter().take(room));
        }
    }

    pub fn invalid_rows(&self) -> usize {
        Field::ALL.iter().map(|f| self.issues(*f).invalid).sum()
    }

    /// True when no row was dropped.
    pub fn is_clean(&self) -> bool {
        self.dropped_rows == 0
    }

    /// Writes the report to the log: a summary line, then one warning per bad field.
    pub fn log_summary(&self) {
        info!(
            "{}: {} rows read, {} usable, {} dropped",
            self.sources.join(", "),
            self.total_rows,
            self.usable_rows,
            self.dropped_rows
        );
        if self.is_clean() {
            return;
        }
        for field in Field::ALL {
            let issues = self.issues(field);
            if issues.invalid == 0 {
                continue;
            }
            warn!("{} invalid {} value(s)", issues.invalid, field.name());
            for raw in &issues.samples {
                warn!("  {}", SampleRow(raw));
            }
        }
        if self.overflow_rows > 0 {
            warn!("{} row(s) dropped because sales overflowed", self.overflow_rows);
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sources: {}", self.sources.join(", "))?;
        writeln!(f, "total rows: {}", self.total_rows)?;
        writeln!(f, "usable rows: {}", self.usable_rows)?;
        writeln!(f, "dropped rows: {}", self.dropped_rows)?;
        for field in Field::ALL {
            let issues = self.issues(field);
            writeln!(
                f,
                "invalid {}: {} (blank: {})",
                field.name(),
                issues.invalid,
                issues.blank
            )?;
            for raw in &issues.samples {
                writeln!(f, "  {}", SampleRow(raw))?;
            }
        }
        if self.overflow_rows > 0 {
            writeln!(f, "overflowed sales: {}", self.overflow_rows)?;
        }
        Ok(())
    }
}

struct SampleRow<'a>(&'a RawRecord);

impl fmt::Display for SampleRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(
            f,
            "row {}: product={:?} price={:?} quantity={:?} date={:?} region={:?}",
            r.row, r.product, r.price, r.quantity, r.date, r.region
        )
    }
}
