use super::movement::Movement;
use super::munch::Munch;
use super::tax_row::{group_tax_rows, TaxRows};
use super::warnings::Warning;
use crate::money::Money;
use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// FIFO inventory accounting over a chronologically sorted movement stream.
///
/// The whole computation runs eagerly in [`Fifo::new`]. Afterwards the
/// remaining open inventory, the realised match trace and the aggregate
/// valuations are available read-only.
///
/// Movements that close the current position (sales against a long position,
/// purchases against a short one) are matched against the oldest open
/// movements first. A closing movement larger than the open position closes
/// it completely and opens a new position of the opposite sign with the
/// remainder.
#[derive(Debug, Clone)]
pub struct Fifo {
    inventory: VecDeque<Movement>,
    balance: i64,
    trace: Vec<Munch>,
    warnings: Vec<Warning>,
    runtime: Duration,
}

impl Default for Fifo {
    fn default() -> Self {
        Fifo::new(&[])
    }
}

impl Fifo {
    /// Runs the FIFO accounting. Movements must already be sorted by date,
    /// they are not reordered here. Out-of-order dates are reported through
    /// [`Fifo::warnings`] but otherwise processed as given.
    ///
    /// Totals are only guaranteed not to overflow for input within the
    /// decoder's limits, see [`MAX_VOLUME`](super::input::MAX_VOLUME).
    pub fn new(movements: &[Movement]) -> Self {
        let started_at = Instant::now();
        let mut fifo = Fifo {
            inventory: VecDeque::new(),
            balance: 0,
            trace: Vec::new(),
            warnings: Vec::new(),
            runtime: Duration::ZERO,
        };

        let mut previous: Option<NaiveDateTime> = None;
        for (index, movement) in movements.iter().enumerate() {
            if let Some(previous) = previous.filter(|p| movement.date < *p) {
                log::warn!(
                    "Entry #{} (tx {}) dated {} precedes the entry before it ({}), holding periods may be wrong",
                    index + 1,
                    movement.id,
                    movement.date,
                    previous
                );
                fifo.warnings.push(Warning::OutOfOrder {
                    index,
                    id: movement.id.clone(),
                    date: movement.date,
                    previous,
                });
            }
            previous = Some(movement.date);
            fifo.process(movement);
        }

        fifo.runtime = started_at.elapsed();
        log::debug!(
            "FIFO done: {} movements, stock={}, {} matches, runtime={:?}",
            movements.len(),
            fifo.balance,
            fifo.trace.len(),
            fifo.runtime
        );
        fifo
    }

    fn process(&mut self, movement: &Movement) {
        if movement.is_zero() {
            log::trace!("Skipping zero quantity tx {}", movement.id);
            return;
        }
        if (self.balance >= 0 && movement.is_acquisition())
            || (self.balance <= 0 && movement.is_disposal())
        {
            self.push(movement.clone());
        } else {
            self.fill(movement.clone());
        }
    }

    /// Adds a movement to the back of the open inventory.
    fn push(&mut self, movement: Movement) {
        self.balance += movement.quantity;
        log::debug!(
            "PUSH tx {}: qty={} @ {}. Stock: {}",
            movement.id,
            movement.quantity,
            movement.price,
            self.balance
        );
        self.inventory.push_back(movement);
    }

    /// Matches a closing movement against the oldest open movements,
    /// reversing the position with whatever is left once the inventory runs out.
    fn fill(&mut self, mut working: Movement) {
        while !working.is_zero() {
            let Some(mut earliest) = self.inventory.pop_front() else {
                log::debug!(
                    "Position reversed by tx {}, {} left open",
                    working.id,
                    working.quantity
                );
                self.push(working);
                return;
            };

            if working.size() <= earliest.size() {
                // working is consumed entirely, earliest keeps any remainder
                let opening = earliest.with_quantity(-working.quantity);
                earliest.quantity += working.quantity;
                if !earliest.is_zero() {
                    self.inventory.push_front(earliest);
                }
                self.balance += working.quantity;
                self.record(Munch::new(opening, working));
                return;
            }

            let closing = working.with_quantity(-earliest.quantity);
            working.quantity += earliest.quantity;
            self.balance += closing.quantity;
            self.record(Munch::new(earliest, closing));
        }
    }

    fn record(&mut self, munch: Munch) {
        log::debug!(
            "MATCH {} x{} (tx {} -> tx {}), stock: {}",
            munch.term(),
            munch.quantity(),
            munch.opening().id,
            munch.closing_id(),
            self.balance
        );
        self.trace.push(munch);
    }

    /// Net open position
    pub fn stock(&self) -> i64 {
        self.balance
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
    }

    /// Value of the open inventory at cost
    pub fn valuation(&self) -> Money {
        self.inventory.iter().map(Movement::amount).sum()
    }

    pub fn valuation_factored(&self) -> Money {
        self.inventory.iter().map(Movement::value).sum()
    }

    /// `None` when the position is flat
    pub fn average_cost(&self) -> Option<Money> {
        (self.balance != 0).then(|| self.valuation() / self.balance)
    }

    pub fn average_cost_factored(&self) -> Option<Money> {
        (self.balance != 0).then(|| self.valuation_factored() / self.balance)
    }

    /// Net signed value of both sides of every match. Realised gains come
    /// out negative since sales carry negative quantities.
    pub fn profit_and_loss(&self) -> Money {
        self.matched_movements().map(Movement::amount).sum()
    }

    pub fn profit_and_loss_factored(&self) -> Money {
        self.matched_movements().map(Movement::value).sum()
    }

    fn matched_movements(&self) -> impl Iterator<Item = &Movement> {
        self.trace
            .iter()
            .flat_map(|m| [m.opening(), m.closing()])
    }

    /// Every match produced, in the order produced
    pub fn trace(&self) -> &[Munch] {
        &self.trace
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Wall-clock time spent computing
    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    /// Disposal groups over the trace
    pub fn tax_rows(&self) -> TaxRows<'_> {
        group_tax_rows(&self.trace)
    }
}
