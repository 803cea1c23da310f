use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Date-only layouts accepted for the invoice date, day first.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Date-time layouts; only the date part is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// One row of the base table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub mall: String,
    pub invoice_date: NaiveDate,
    pub age: u32,
    pub gender: Gender,
    pub category: String,
    pub quantity: u32,
    pub price: Money,
    pub payment_method: String,
}

/// Customer gender, kept as the label the dataset uses.
///
/// Labels are only trimmed, so `F` and `Female` stay distinct groups and
/// legends show exactly what the file contains.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gender(String);

impl Gender {
    pub fn parse(raw: &str) -> Self {
        Gender(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Gender {
    fn from(raw: &str) -> Self {
        Gender::parse(raw)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Most fractional digits a price may carry.
pub const MAX_SCALE: u32 = 12;

/// An exact decimal amount, `units / 10^scale`.
///
/// Always stored with the smallest scale that represents the value, so
/// `40`, `40.0` and `40.00` are the same `Money`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Money {
    units: i128,
    scale: u32,
}

impl Money {
    pub const ZERO: Money = Money { units: 0, scale: 0 };

    pub fn new(mut units: i128, mut scale: u32) -> Self {
        while scale > 0 && units % 10 == 0 {
            units /= 10;
            scale -= 1;
        }
        Money { units, scale }
    }

    pub fn from_cents(cents: i64) -> Self {
        Money::new(i128::from(cents), 2)
    }

    /// Number of fractional digits needed to write the value exactly.
    pub fn scale(self) -> u32 {
        self.scale
    }

    pub fn as_f64(self) -> f64 {
        self.units as f64 / 10f64.powi(self.scale as i32)
    }

    fn units_at(self, scale: u32) -> i128 {
        self.units * 10i128.pow(scale - self.scale)
    }

    /// Parses a plain decimal such as `1500.4`, `40` or `40.125`.
    ///
    /// Trailing fractional zeros are dropped; more than [`MAX_SCALE`]
    /// significant fractional digits is rejected rather than rounded.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > MAX_SCALE as usize {
            return None;
        }

        let scale = fraction.len() as u32;
        let whole: i128 = whole.parse().ok()?;
        let fraction: i128 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
        let units = whole.checked_mul(10i128.pow(scale))?.checked_add(fraction)?;
        Some(Money::new(if negative { -units } else { units }, scale))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        let scale = self.scale.max(rhs.scale);
        Money::new(self.units_at(scale) + rhs.units_at(scale), scale)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.units_at(scale).cmp(&other.units_at(scale))
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Written with at least two fractional digits: `40.00`, `40.125`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.scale.max(2);
        let units = self.units_at(shown);
        let sign = if units < 0 { "-" } else { "" };
        let abs = units.unsigned_abs();
        let pow = 10u128.pow(shown);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / pow,
            abs % pow,
            width = shown as usize
        )
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// A calendar month, ordered chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Month { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month directly after this one.
    pub fn succ(self) -> Self {
        if self.month >= 12 {
            Month::new(self.year + 1, 1)
        } else {
            Month::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses an invoice date using the day-first convention.
///
/// Only four-digit years are accepted; `05/01/24` is rejected rather than
/// read as the year 24.
pub fn parse_day_first_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !has_four_digit_year(raw) {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn has_four_digit_year(raw: &str) -> bool {
    let date_part = raw.split([' ', 'T']).next().unwrap_or("");
    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return false;
    }
    parts[0].len() == 4 || parts[2].len() == 4
}
