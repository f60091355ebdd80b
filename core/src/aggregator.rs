//! Accumulates per-target outcomes into a [`SweepReport`].
//!
//! Records are bucketed by [`Target`], whose ordering is the enumeration order,
//! so the report comes out sorted no matter in which order probes complete.

use std::collections::BTreeMap;
use std::time::Duration;

use netdetective_common::network::target::Target;
use netdetective_common::probe::{Outcome, OutcomeClass};
use tokio::time::Instant;

/// Tallies of one sweep.
///
/// `success + negative + errors + cancelled == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub negative: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn count(&mut self, class: OutcomeClass) {
        self.total += 1;
        match class {
            OutcomeClass::Success => self.success += 1,
            OutcomeClass::Negative => self.negative += 1,
            OutcomeClass::Error => self.errors += 1,
            OutcomeClass::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport<R> {
    /// One entry per target, in enumeration order.
    pub entries: Vec<(Target, R)>,
    pub summary: Summary,
}

impl<R> SweepReport<R> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Aggregator<R> {
    started: Instant,
    records: BTreeMap<Target, R>,
    frozen: Option<Duration>,
}

impl<R: Outcome> Aggregator<R> {
    /// `started` is the beginning of the sweep, before target expansion.
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            records: BTreeMap::new(),
            frozen: None,
        }
    }

    /// Records the outcome for `target`.
    ///
    /// # Precondition
    /// Each target is added at most once per sweep. Adding a target twice is a
    /// programming error in the caller.
    pub fn add_result(&mut self, target: Target, result: R) {
        let previous = self.records.insert(target, result);
        debug_assert!(previous.is_none(), "{target} was aggregated twice");
        self.frozen = None;
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.records.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.class() == OutcomeClass::Success)
            .count()
    }

    /// Builds the report. Elapsed time is fixed at the first call, so repeated
    /// calls without new results return identical reports.
    pub fn finalize(&mut self) -> SweepReport<R> {
        let elapsed = *self.frozen.get_or_insert_with(|| self.started.elapsed());

        let mut summary = Summary {
            elapsed,
            ..Summary::default()
        };
        for result in self.records.values() {
            summary.count(result.class());
        }

        SweepReport {
            entries: self
                .records
                .iter()
                .map(|(target, result)| (*target, result.clone()))
                .collect(),
            summary,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
