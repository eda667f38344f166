//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// -----------------------------------------------------------------------------
// Money
// -----------------------------------------------------------------------------

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount in the gateway's minor units (cents). `None` on overflow.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED).to_i64()
}

pub fn from_minor_units(minor: i64) -> Decimal { Decimal::new(minor, 2) }

// -----------------------------------------------------------------------------
// Rating
// -----------------------------------------------------------------------------

/// Star rating, 1 to 5 inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if !(1..=5).contains(&value) { return Err(RatingError::OutOfRange(value)); }
        Ok(Self(value as u8))
    }
    pub fn value(self) -> u8 { self.0 }
    pub fn as_i16(self) -> i16 { i16::from(self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RatingError { OutOfRange(i64) }
impl std::error::Error for RatingError {}
impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::OutOfRange(v) => write!(f, "Rating must be between 1 and 5, got {v}") }
    }
}

/// Mean of the given ratings rounded to one decimal, or zero when empty.
pub fn average_rating(ratings: &[i16]) -> Decimal {
    if ratings.is_empty() { return Decimal::ZERO; }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    (Decimal::from(sum) / Decimal::from(ratings.len() as i64))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

// -----------------------------------------------------------------------------
// Per-size stock
// -----------------------------------------------------------------------------

/// Stock broken down by size label. Persisted as a JSON object in a text column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeStock(BTreeMap<String, u32>);

impl SizeStock {
    /// Parses the persisted text form. Blank text means no per-size tracking.
    pub fn parse(raw: Option<&str>) -> Result<Self, SizeStockError> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(raw) => raw,
        };
        let entries: BTreeMap<String, i64> =
            serde_json::from_str(raw).map_err(|e| SizeStockError::Malformed(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Builds a validated table: labels non-empty, quantities non-negative.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, i64)>) -> Result<Self, SizeStockError> {
        let mut table = BTreeMap::new();
        for (label, qty) in entries {
            let label = label.trim().to_string();
            if label.is_empty() { return Err(SizeStockError::EmptyLabel); }
            let qty = u32::try_from(qty).map_err(|_| SizeStockError::InvalidQuantity { size: label.clone(), quantity: qty })?;
            table.insert(label, qty);
        }
        Ok(Self(table))
    }

    pub fn to_text(&self) -> Result<Option<String>, serde_json::Error> {
        if self.0.is_empty() { return Ok(None); }
        serde_json::to_string(&self.0).map(Some)
    }

    pub fn is_tracked(&self) -> bool { !self.0.is_empty() }
    pub fn total(&self) -> u64 { self.0.values().map(|q| u64::from(*q)).sum() }
    pub fn for_size(&self, size: &str) -> u32 { self.0.get(size).copied().unwrap_or(0) }
    pub fn sizes(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeStockError { Malformed(String), EmptyLabel, InvalidQuantity { size: String, quantity: i64 } }
impl std::error::Error for SizeStockError {}
impl fmt::Display for SizeStockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "per-size stock is not a valid size table: {e}"),
            Self::EmptyLabel => write!(f, "per-size stock has an empty size label"),
            Self::InvalidQuantity { size, quantity } => write!(f, "per-size stock for {size} must be a non-negative integer, got {quantity}"),
        }
    }
}

// -----------------------------------------------------------------------------
// Tags, slugs, variant labels
// -----------------------------------------------------------------------------

/// Splits a comma-separated tag list, dropping blanks.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default().split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
}

pub fn join_tags(tags: &[String]) -> Option<String> {
    let joined = tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(",");
    (!joined.is_empty()).then_some(joined)
}

/// URL key derived from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "item".to_string() } else { slug.to_string() }
}

/// Trims an optional variant selector, treating blank as absent.
pub fn normalize_option(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Human-readable variant label, e.g. `Size: M | Color: Blue`.
pub fn selected_options(size: Option<&str>, color: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(size) = size { parts.push(format!("Size: {size}")); }
    if let Some(color) = color { parts.push(format!("Color: {color}")); }
    (!parts.is_empty()).then(|| parts.join(" | "))
}
