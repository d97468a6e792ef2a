use super::movement::Movement;
use crate::money::Money;
use chrono::Duration;
use serde::Serialize;
use std::fmt;

/// Longest holding period that still counts as short-term
pub const SHORT_TERM_DAYS: i64 = 365;

/// Tax term of a realised gain or loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Term {
    Short,
    Long,
}

impl Term {
    pub fn from_holding_period(period: Duration) -> Self {
        if period <= Duration::days(SHORT_TERM_DAYS) {
            Term::Short
        } else {
            Term::Long
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Term::Short)
    }

    pub fn display(&self) -> &'static str {
        match self {
            Term::Short => "ST",
            Term::Long => "LT",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display())
    }
}

/// A FIFO-matched pair: the opening movement and the closing movement that
/// nets it off. Both sides carry exactly opposite quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Munch {
    opening: Movement,
    closing: Movement,
}

impl Munch {
    pub(crate) fn new(opening: Movement, closing: Movement) -> Self {
        assert_eq!(
            opening.quantity, -closing.quantity,
            "unequal match: opening={} closing={}",
            opening.quantity, closing.quantity
        );
        Munch { opening, closing }
    }

    pub fn opening(&self) -> &Movement {
        &self.opening
    }

    pub fn closing(&self) -> &Movement {
        &self.closing
    }

    pub fn closing_id(&self) -> &str {
        &self.closing.id
    }

    /// Matched quantity, signed as the opening side
    pub fn quantity(&self) -> i64 {
        self.opening.quantity
    }

    pub fn cost_basis(&self) -> Money {
        self.opening.amount()
    }

    /// Signed as the closing side, so negative for a sale
    pub fn proceeds(&self) -> Money {
        self.closing.amount()
    }

    pub fn holding_period(&self) -> Duration {
        self.closing.date - self.opening.date
    }

    pub fn term(&self) -> Term {
        Term::from_holding_period(self.holding_period())
    }

    pub fn is_short_term(&self) -> bool {
        self.term().is_short()
    }
}

impl fmt::Display for Munch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = if self.is_short_term() { "ST" } else { "  " };
        write!(
            f,
            "({}, sh {}, CB = {:>12}, {}), {}, Proceeds {:>12}",
            self.opening,
            self.quantity(),
            self.cost_basis(),
            self.closing,
            term,
            -self.proceeds()
        )
    }
}
