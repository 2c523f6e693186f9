//! The narrow exit surface: everything the detector asks of its host.

use parking_lot::Mutex;

use racewatch_core::defs::{StackId, Tid};
use racewatch_core::report::ReportDesc;

/// Callbacks the embedding host provides. The detector calls these from
/// arbitrary analyzed threads; implementations must tolerate that and must
/// not re-enter the detector (re-entrant events are dropped).
pub trait Host: Send + Sync {
    /// Deliver a finished report. The host symbolizes and prints.
    fn report(&self, desc: &ReportDesc);

    /// Capture the calling thread's stack as an opaque handle the host can
    /// later resolve. The default host has no unwinder.
    fn current_stack(&self, _tid: Tid) -> StackId {
        StackId(0)
    }
}

/// Host that accumulates reports in memory. Bring-up and test aid.
#[derive(Default)]
pub struct CollectingHost {
    reports: Mutex<Vec<ReportDesc>>,
}

impl CollectingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything reported so far.
    #[must_use]
    pub fn reports(&self) -> Vec<ReportDesc> {
        self.reports.lock().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl Host for CollectingHost {
    fn report(&self, desc: &ReportDesc) {
        self.reports.lock().push(desc.clone());
    }
}
