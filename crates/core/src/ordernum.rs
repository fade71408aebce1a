use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error("order-number prefix must be non-empty ASCII alphanumeric, got `{0}`")]
    InvalidPrefix(String),
    #[error("order-number sequence width must be in range 1..=8, got {0}")]
    InvalidWidth(usize),
}

/// Shape of assigned order numbers: `<prefix>-<YYYYMM>-<zero-padded seq>`,
/// e.g. `R1-202608-0017`. This half is pure formatting and parsing; the
/// read-max-then-assign step lives with the persistence layer, inside the
/// terminal-approval transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderNumberFormat {
    prefix: String,
    sequence_width: usize,
}

impl OrderNumberFormat {
    pub fn new(prefix: impl Into<String>, sequence_width: usize) -> Result<Self, OrderNumberError> {
        let prefix = prefix.into();
        if prefix.is_empty() || !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(OrderNumberError::InvalidPrefix(prefix));
        }
        if !(1..=8).contains(&sequence_width) {
            return Err(OrderNumberError::InvalidWidth(sequence_width));
        }
        Ok(Self { prefix, sequence_width })
    }

    /// The stock regional numbering: `R1-YYYYMM-NNNN`.
    pub fn regional_default() -> Self {
        Self::new("R1", 4).expect("default format is well formed")
    }

    /// Prefix shared by every number assigned in the month of `on`,
    /// including the trailing separator: `R1-202608-`.
    pub fn month_prefix(&self, on: NaiveDate) -> String {
        format!("{}-{:04}{:02}-", self.prefix, on.year(), on.month())
    }

    pub fn render(&self, on: NaiveDate, sequence: u32) -> String {
        format!("{}{:0width$}", self.month_prefix(on), sequence, width = self.sequence_width)
    }

    /// Sequence component of `number` if it belongs to `month_prefix`.
    /// Malformed tails are ignored rather than treated as zero, so a stray
    /// legacy value can never collide with generated numbers.
    pub fn sequence_of(&self, month_prefix: &str, number: &str) -> Option<u32> {
        let tail = number.strip_prefix(month_prefix)?;
        if tail.is_empty() || !tail.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        tail.parse().ok()
    }
}
