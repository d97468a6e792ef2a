use super::munch::{Munch, Term};
use crate::money::Money;
use std::fmt;

/// Consecutive matches closed by the same transaction with the same tax term,
/// reported together as one disposal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxRow<'a> {
    closing_id: &'a str,
    term: Term,
    munches: &'a [Munch],
}

impl<'a> TaxRow<'a> {
    pub fn closing_id(&self) -> &'a str {
        self.closing_id
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn is_short_term(&self) -> bool {
        self.term.is_short()
    }

    pub fn munches(&self) -> &'a [Munch] {
        self.munches
    }

    pub fn len(&self) -> usize {
        self.munches.len()
    }

    pub fn quantity(&self) -> i64 {
        self.munches.iter().map(Munch::quantity).sum()
    }

    pub fn cost_basis(&self) -> Money {
        self.munches.iter().map(Munch::cost_basis).sum()
    }

    /// Positive for a sale, the negated closing value
    pub fn proceeds(&self) -> Money {
        -self.munches.iter().map(Munch::proceeds).sum::<Money>()
    }

    pub fn gain(&self) -> Money {
        self.proceeds() - self.cost_basis()
    }
}

impl fmt::Display for TaxRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = if self.is_short_term() { "ST" } else { "  " };
        write!(
            f,
            "TaxRow(out.tx={}, {} cb={:>12}  proceeds={:>12})[{}]",
            self.closing_id,
            term,
            self.cost_basis(),
            self.proceeds(),
            self.len()
        )
    }
}

/// Lazily splits a match trace into runs sharing `(closing id, term)`.
///
/// Only adjacent matches are grouped: a key that reappears after a different
/// one starts a new row.
#[derive(Debug, Clone)]
pub struct TaxRows<'a> {
    remaining: &'a [Munch],
}

pub fn group_tax_rows(trace: &[Munch]) -> TaxRows<'_> {
    TaxRows { remaining: trace }
}

impl<'a> Iterator for TaxRows<'a> {
    type Item = TaxRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining;
        let first = remaining.first()?;
        let closing_id = first.closing_id();
        let term = first.term();

        let run = remaining
            .iter()
            .take_while(|m| m.closing_id() == closing_id && m.term() == term)
            .count();
        let (munches, rest) = remaining.split_at(run);
        self.remaining = rest;

        Some(TaxRow {
            closing_id,
            term,
            munches,
        })
    }
}
