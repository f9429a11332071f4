//! Metrics sink boundary.
//!
//! Container logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between container mutation
//! paths and the thread-local metrics state.

use crate::{error::ErrorClass, obs::metrics};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    KeyAdded,
    BindingInserted,
    KeyRemoved,
    Cleared {
        keys: u64,
    },
    MergeApplied {
        keys: u64,
    },
    SubtractApplied {
        bindings_removed: u64,
    },
    ValidationRejected {
        class: ErrorClass,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// Route an event to the installed sink, or the default counters.
pub(crate) fn emit(event: MetricsEvent) {
    let handled = SINK_OVERRIDE.with_borrow(|sink| {
        if let Some(sink) = sink {
            sink.record(event);
            true
        } else {
            false
        }
    });

    if !handled {
        metrics::record(event);
    }
}

/// Run `f` with `sink` installed as the metrics destination for this
/// thread, restoring the default counters afterwards.
pub fn with_sink<R>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> R) -> R {
    SINK_OVERRIDE.with_borrow_mut(|slot| *slot = Some(sink));
    let result = f();
    SINK_OVERRIDE.with_borrow_mut(|slot| *slot = None);
    result
}

/// Snapshot of the default thread-local counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the default thread-local counters to zero.
pub fn metrics_reset() {
    metrics::reset();
}

///
/// CaptureSink
///
/// Records every event for deterministic test assertions.
///

#[derive(Debug, Default)]
pub struct CaptureSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl CaptureSink {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.borrow().clone()
    }
}

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

///
/// TESTS
///
