// Loader settings, overridable from the environment.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use log::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Offending rows kept per field in the diagnostics sample.
    pub sample_size: usize,
    /// Keep only rows for this product (case-insensitive).
    pub product: Option<String>,
    /// Keep only rows for this region (case-insensitive, "all" keeps everything).
    pub region: Option<String>,
    pub event_date: NaiveDate,
    pub event_label: String,
    /// Where to write the cleaned, filtered rows as CSV, if anywhere.
    pub rows_out: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            sample_size: 5,
            product: None,
            region: None,
            event_date: NaiveDate::from_ymd_opt(2021, 1, 15).unwrap_or_default(),
            event_label: "Price Increase (15 Jan 2021)".to_string(),
            rows_out: None,
        }
    }
}

impl LoaderConfig {
    /// Defaults overlaid with `SALES_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(size) = parse_var(&lookup, "SALES_SAMPLE_SIZE") {
            config.sample_size = size;
        }
        if let Some(product) = text_var(&lookup, "SALES_PRODUCT") {
            config.product = Some(product);
        }
        if let Some(region) = text_var(&lookup, "SALES_REGION") {
            config.region = Some(region);
        }
        if let Some(date) = text_var(&lookup, "SALES_EVENT_DATE") {
            match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                Ok(d) => config.event_date = d,
                Err(e) => warn!("ignoring SALES_EVENT_DATE={:?}: {}", date, e),
            }
        }
        if let Some(label) = text_var(&lookup, "SALES_EVENT_LABEL") {
            config.event_label = label;
        }
        if let Some(path) = text_var(&lookup, "SALES_ROWS_OUT") {
            config.rows_out = Some(PathBuf::from(path));
        }

        config
    }
}

fn text_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = text_var(lookup, key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
