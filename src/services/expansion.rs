//! Per-row disclosure state for orders with several items.
//!
//! Every row starts `Collapsed`. A toggle moves it into a transient phase
//! synchronously and a timer settles it later:
//!
//! ```text
//! Collapsed --toggle--> Expanding --expand delay--> Expanded
//! Expanded  --toggle--> Collapsing --collapse delay--> Collapsed
//! ```
//!
//! Toggles that arrive while a row is `Expanding` or `Collapsing` are
//! ignored; the running timer is never cancelled or stacked. A timer only
//! completes the transition it was started for, so a row never skips a
//! phase. [`ExpansionTracker::reset`] starts a new epoch and timers from an
//! older epoch settle nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::services::rollup::OrderRow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPhase {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

impl ExpansionPhase {
    pub fn is_transient(self) -> bool {
        matches!(self, ExpansionPhase::Expanding | ExpansionPhase::Collapsing)
    }

    /// Phase a timer settles this transient phase into.
    fn settled(self) -> Option<ExpansionPhase> {
        match self {
            ExpansionPhase::Expanding => Some(ExpansionPhase::Expanded),
            ExpansionPhase::Collapsing => Some(ExpansionPhase::Collapsed),
            _ => None,
        }
    }
}

/// Result of a toggle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A transition began; carries the transient phase entered.
    Started(ExpansionPhase),
    /// The row is mid-transition; carries its current phase.
    IgnoredInFlight(ExpansionPhase),
    /// The row has at most one child and stays collapsed.
    NotExpandable,
}

/// Rows that can be disclosed.
pub trait Expandable {
    fn row_id(&self) -> Uuid;
    fn child_count(&self) -> usize;
}

impl Expandable for OrderRow {
    fn row_id(&self) -> Uuid {
        self.id()
    }

    fn child_count(&self) -> usize {
        self.summary.item_count
    }
}

impl Expandable for (Uuid, usize) {
    fn row_id(&self) -> Uuid {
        self.0
    }

    fn child_count(&self) -> usize {
        self.1
    }
}

/// Shared expansion state keyed by row id.
///
/// Cloning yields another handle onto the same map. Collapsed rows are not
/// stored.
#[derive(Clone, Debug)]
pub struct ExpansionTracker {
    phases: Arc<DashMap<Uuid, ExpansionPhase>>,
    // Expanding rows a collapse-all reached; they collapse once expanded.
    collapse_on_settle: Arc<DashSet<Uuid>>,
    epoch: Arc<AtomicU64>,
    expand_delay: Duration,
    collapse_delay: Duration,
}

impl ExpansionTracker {
    pub fn new(expand_delay: Duration, collapse_delay: Duration) -> Self {
        Self {
            phases: Arc::new(DashMap::new()),
            collapse_on_settle: Arc::new(DashSet::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            expand_delay,
            collapse_delay,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.expand_delay(), config.collapse_delay())
    }

    pub fn phase(&self, id: Uuid) -> ExpansionPhase {
        self.phases.get(&id).map(|entry| *entry).unwrap_or_default()
    }

    /// Whether the row's items should currently be rendered.
    pub fn children_visible(&self, id: Uuid) -> bool {
        self.phase(id) != ExpansionPhase::Collapsed
    }

    /// Starts the next transition for `id`. Must be called inside a tokio
    /// runtime.
    pub fn toggle(&self, id: Uuid, child_count: usize) -> ToggleOutcome {
        if child_count <= 1 {
            return ToggleOutcome::NotExpandable;
        }

        let started = {
            let mut entry = self.phases.entry(id).or_default();
            let current = *entry;
            match current {
                phase if phase.is_transient() => Err(phase),
                ExpansionPhase::Collapsed => {
                    *entry = ExpansionPhase::Expanding;
                    Ok(ExpansionPhase::Expanding)
                }
                _ => {
                    *entry = ExpansionPhase::Collapsing;
                    Ok(ExpansionPhase::Collapsing)
                }
            }
        };

        match started {
            Ok(phase) => {
                self.schedule_settle(vec![id], phase);
                ToggleOutcome::Started(phase)
            }
            Err(phase) => {
                debug!(row = %id, ?phase, "toggle ignored while transition in flight");
                ToggleOutcome::IgnoredInFlight(phase)
            }
        }
    }

    /// Expands every collapsed row that has more than one child. Returns the
    /// number of rows that started expanding. Rows already expanding stay
    /// expanded even if a collapse-all had reached them.
    pub fn expand_all<R: Expandable>(&self, rows: &[R]) -> usize {
        let mut started = Vec::new();
        for row in rows.iter().filter(|row| row.child_count() > 1) {
            let id = row.row_id();
            let mut entry = self.phases.entry(id).or_default();
            match *entry {
                ExpansionPhase::Collapsed => {
                    *entry = ExpansionPhase::Expanding;
                    started.push(id);
                }
                ExpansionPhase::Expanding => {
                    self.collapse_on_settle.remove(&id);
                }
                _ => {}
            }
        }
        let count = started.len();
        if count > 0 {
            self.schedule_settle(started, ExpansionPhase::Expanding);
        }
        count
    }

    /// Collapses every row that is not already collapsed or collapsing.
    ///
    /// `Expanded` rows start collapsing now. `Expanding` rows keep their
    /// running timer: they settle into `Expanded` and immediately start
    /// collapsing, so every row ends `Collapsed`. Returns the number of rows
    /// that will collapse.
    pub fn collapse_all(&self) -> usize {
        let mut started = Vec::new();
        let mut deferred = 0;
        for mut entry in self.phases.iter_mut() {
            match *entry {
                ExpansionPhase::Expanded => {
                    *entry = ExpansionPhase::Collapsing;
                    started.push(*entry.key());
                }
                ExpansionPhase::Expanding => {
                    self.collapse_on_settle.insert(*entry.key());
                    deferred += 1;
                }
                _ => {}
            }
        }
        let count = started.len();
        if count > 0 {
            self.schedule_settle(started, ExpansionPhase::Collapsing);
        }
        count + deferred
    }

    /// Forgets every row. Timers still in flight belong to the previous
    /// epoch and settle nothing, even for rows toggled again afterwards.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.phases.clear();
        self.collapse_on_settle.clear();
    }

    /// Rows that are not collapsed, with their phase.
    pub fn snapshot(&self) -> Vec<(Uuid, ExpansionPhase)> {
        self.phases
            .iter()
            .filter(|entry| *entry.value() != ExpansionPhase::Collapsed)
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    fn schedule_settle(&self, ids: Vec<Uuid>, from: ExpansionPhase) {
        let Some(to) = from.settled() else {
            return;
        };
        let delay = match from {
            ExpansionPhase::Expanding => self.expand_delay,
            _ => self.collapse_delay,
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        let tracker = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tracker.epoch.load(Ordering::SeqCst) != epoch {
                debug!(rows = ids.len(), "stale expansion timer dropped");
                return;
            }
            let mut collapse_next = Vec::new();
            for id in ids {
                if to == ExpansionPhase::Collapsed {
                    tracker.phases.remove_if(&id, |_, phase| *phase == from);
                } else if let Some(mut phase) = tracker.phases.get_mut(&id) {
                    if *phase != from {
                        continue;
                    }
                    if tracker.collapse_on_settle.remove(&id).is_some() {
                        *phase = ExpansionPhase::Collapsing;
                        collapse_next.push(id);
                    } else {
                        *phase = to;
                    }
                }
            }
            if !collapse_next.is_empty() {
                tracker.schedule_settle(collapse_next, ExpansionPhase::Collapsing);
            }
        });
    }
}

impl Default for ExpansionTracker {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
