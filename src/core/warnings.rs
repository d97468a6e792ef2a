use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Non-fatal diagnostics collected while matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Movement dated before the one preceding it. Holding periods of any
    /// match involving it may be negative or meaningless.
    OutOfOrder {
        /// Zero-based position in the input sequence
        index: usize,
        id: String,
        date: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::OutOfOrder { .. } => "OutOfOrder",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::OutOfOrder {
                index,
                id,
                date,
                previous,
            } => write!(
                f,
                "entry #{} (tx {}) dated {} is earlier than the preceding entry dated {}",
                index + 1,
                id,
                date.date(),
                previous.date()
            ),
        }
    }
}
