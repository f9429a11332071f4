//! Default thread-local mutation counters.

use crate::obs::sink::MetricsEvent;
use std::cell::RefCell;

thread_local! {
    static COUNTERS: RefCell<EventReport> = const { RefCell::new(EventReport::ZERO) };
}

///
/// EventReport
///
/// Point-in-time snapshot of the mutation counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventReport {
    pub keys_added: u64,
    pub bindings_inserted: u64,
    pub keys_removed: u64,
    pub clears: u64,
    pub merges: u64,
    pub subtracts: u64,
    pub validation_rejections: u64,
}

impl EventReport {
    pub(crate) const ZERO: Self = Self {
        keys_added: 0,
        bindings_inserted: 0,
        keys_removed: 0,
        clears: 0,
        merges: 0,
        subtracts: 0,
        validation_rejections: 0,
    };
}

pub(crate) fn record(event: MetricsEvent) {
    COUNTERS.with_borrow_mut(|counters| match event {
        MetricsEvent::KeyAdded => counters.keys_added += 1,
        MetricsEvent::BindingInserted => counters.bindings_inserted += 1,
        MetricsEvent::KeyRemoved => counters.keys_removed += 1,
        MetricsEvent::Cleared { .. } => counters.clears += 1,
        MetricsEvent::MergeApplied { .. } => counters.merges += 1,
        MetricsEvent::SubtractApplied { .. } => counters.subtracts += 1,
        MetricsEvent::ValidationRejected { .. } => counters.validation_rejections += 1,
    });
}

#[must_use]
pub(crate) fn report() -> EventReport {
    COUNTERS.with_borrow(|counters| *counters)
}

pub(crate) fn reset() {
    COUNTERS.with_borrow_mut(|counters| *counters = EventReport::ZERO);
}
