use crate::money::Money;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Caller-supplied extra fields, carried through matching untouched.
pub type Metadata = BTreeMap<String, String>;

/// A single dated, priced change in the quantity held of the instrument.
///
/// Positive quantities are acquisitions, negative quantities are disposals
/// and a zero quantity is valid but never affects the position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    /// Transaction or lot label, not unique across a stream
    pub id: String,
    pub quantity: i64,
    /// Per-unit price, never negative
    pub price: Money,
    pub date: NaiveDateTime,
    /// Multiplier applied to valuations only
    pub factor: Decimal,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl Movement {
    pub fn new(id: impl Into<String>, quantity: i64, price: Money, date: NaiveDateTime) -> Self {
        Movement {
            id: id.into(),
            quantity,
            price,
            date,
            factor: Decimal::ONE,
            metadata: Metadata::new(),
        }
    }

    pub fn with_factor(mut self, factor: Decimal) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy of this movement carrying a different quantity.
    pub fn with_quantity(&self, quantity: i64) -> Self {
        Movement {
            quantity,
            ..self.clone()
        }
    }

    pub fn size(&self) -> u64 {
        self.quantity.unsigned_abs()
    }

    pub fn is_acquisition(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_disposal(&self) -> bool {
        !self.is_acquisition()
    }

    pub fn is_zero(&self) -> bool {
        self.quantity == 0
    }

    /// Unfactored signed value: `quantity * price`
    pub fn amount(&self) -> Money {
        self.price * self.quantity
    }

    /// Signed value: `quantity * price * factor`
    pub fn value(&self) -> Money {
        self.amount() * self.factor
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:10} @ {:>6} on {} tx {:>3}",
            self.quantity,
            self.price,
            self.date.date(),
            self.id
        )
    }
}
