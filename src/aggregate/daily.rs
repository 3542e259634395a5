use std::collections::BTreeMap;
use std::io;

use chrono::NaiveDate;
use csv::Writer;
use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::records::SalesRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub sales: Decimal,
}

/// Total sales per date, strictly ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyAggregate {
    points: Vec<DailyPoint>,
}

/// Sales totals on either side of a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSplit {
    pub event_date: NaiveDate,
    /// Sales strictly before `event_date`.
    pub before: Decimal,
    /// Sales on or after `event_date`.
    pub on_or_after: Decimal,
}

impl DailyAggregate {
    /// Groups rows by date and sums their sales. Rows sharing a date are added, never replaced.
    ///
    /// A row that would overflow its day's total is removed from `records`
    /// and left out of the sum. Returns the number of rows removed that way.
    pub fn from_records(records: &mut Vec<SalesRecord>) -> (Self, usize) {
        let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        let before = records.len();

        records.retain(|record| {
            let total = totals.entry(record.date).or_insert(Decimal::ZERO);
            match total.checked_add(record.sales) {
                Some(sum) => {
                    *total = sum;
                    true
                }
                None => {
                    warn!("sales total for {} overflowed, dropping a row", record.date);
                    false
                }
            }
        });

        let aggregate = Self {
            points: totals
                .into_iter()
                .map(|(date, sales)| DailyPoint { date, sales })
                .collect(),
        };
        (aggregate, before - records.len())
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<Decimal> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].sales)
    }

    /// Sum over every date, or `None` if it overflows.
    pub fn total(&self) -> Option<Decimal> {
        checked_sum(&self.points)
    }

    /// Totals before and on/after `event_date`, or `None` if either side overflows.
    pub fn split_at(&self, event_date: NaiveDate) -> Option<EventSplit> {
        let idx = self.points.partition_point(|p| p.date < event_date);
        let (before, after) = self.points.split_at(idx);
        Some(EventSplit {
            event_date,
            before: checked_sum(before)?,
            on_or_after: checked_sum(after)?,
        })
    }

    /// Writes `date,sales` rows with a header.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = Writer::from_writer(writer);
        for point in &self.points {
            wtr.serialize(point)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn checked_sum(points: &[DailyPoint]) -> Option<Decimal> {
    points
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.sales))
}
