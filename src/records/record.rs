use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Canonical (trimmed, lowercase) names of the columns every input must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["product", "price", "quantity", "date", "region"];

/// One input row, every field still text and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based data row index within its source (the header is row 0).
    pub row: usize,
    pub product: String,
    pub price: String,
    pub quantity: String,
    pub date: String,
    pub region: String,
}

/// A raw row plus its coerced fields. Absent means blank or unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub raw: RawRecord,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub date: Option<NaiveDate>,
    pub sales: Option<Decimal>,
}

impl CleanedRecord {
    pub fn is_usable(&self) -> bool {
        self.price.is_some() && self.quantity.is_some() && self.date.is_some() && self.sales.is_some()
    }

    /// Converts into a fully typed row, or `None` if any coerced field is absent.
    pub fn into_usable(self) -> Option<SalesRecord> {
        Some(SalesRecord {
            price: self.price?,
            quantity: self.quantity?,
            date: self.date?,
            sales: self.sales?,
            product: self.raw.product,
            region: self.raw.region,
        })
    }
}

/// A usable row: every field present, `sales = price * quantity`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub product: String,
    pub price: Decimal,
    pub quantity: i64,
    pub date: NaiveDate,
    pub region: String,
    pub sales: Decimal,
}

impl SalesRecord {
    /// Case-insensitive match on product and region; `None` (or region "all") matches anything.
    pub fn matches(&self, product: Option<&str>, region: Option<&str>) -> bool {
        let product_ok = product.is_none_or(|p| self.product.trim().eq_ignore_ascii_case(p.trim()));
        let region_ok = region
            .map(str::trim)
            .is_none_or(|r| r.eq_ignore_ascii_case("all") || self.region.trim().eq_ignore_ascii_case(r));
        product_ok && region_ok
    }
}
