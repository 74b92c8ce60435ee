//=========================================================================
// Progress Reporter
//=========================================================================
//
// Clamped [0, 1] progress value shared between a transition and the
// stack (or queue) waiting on it.
//
// Architecture:
//   state ── update_progress() ──> Arc<Mutex<ReporterState>>  (polled: is_done)
//                              └─> Sender<ReporterSignal>     (drained: events)
//
// Progress only moves forward and is frozen once it reaches 1.0.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Sender, TrySendError};
use log::trace;

//=== Reporter Signal =====================================================

/// Progress notification sent from a reporter to the stack that issued it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReporterSignal {
    pub ticket: u64,
    pub progress: f32,
}

//=== Shared State ========================================================

type DoneCallback = Box<dyn FnOnce() + Send>;

struct ReporterState {
    progress: f32,
    on_done: Option<DoneCallback>,
}

//=== ProgressReporter ====================================================

/// Progress handle passed into transition callbacks.
///
/// Cloning the reporter yields another handle to the same progress value,
/// so a state can keep one clone for later completion (e.g. after a load
/// finishes on another thread) while the stack polls the other.
///
/// Written values are clamped into `[0, 1]`; once the value reaches `1.0`
/// the reporter is done and ignores further updates.
#[derive(Clone)]
pub struct ProgressReporter {
    ticket: u64,
    shared: Arc<Mutex<ReporterState>>,
    signals: Option<Sender<ReporterSignal>>,
}

impl ProgressReporter {
    //--- Construction -----------------------------------------------------

    /// Creates a standalone reporter at progress `0.0`.
    pub fn new() -> Self {
        Self::build(0, None, None)
    }

    /// Creates a standalone reporter that runs `on_done` once it completes.
    pub fn with_callback<F>(on_done: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::build(0, None, Some(Box::new(on_done)))
    }

    /// Creates a reporter that forwards every accepted value to `signals`.
    pub(crate) fn attached(ticket: u64, signals: Sender<ReporterSignal>) -> Self {
        Self::build(ticket, Some(signals), None)
    }

    fn build(ticket: u64, signals: Option<Sender<ReporterSignal>>, on_done: Option<DoneCallback>) -> Self {
        Self {
            ticket,
            shared: Arc::new(Mutex::new(ReporterState {
                progress: 0.0,
                on_done,
            })),
            signals,
        }
    }

    //--- Updates ----------------------------------------------------------

    /// Records a new progress value.
    ///
    /// The value is clamped into `[0, 1]` (`NaN` counts as `0.0`). Values below
    /// the current progress and calls made after the reporter is done are
    /// ignored.
    pub fn update_progress(&self, value: f32) {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };

        let on_done = {
            let mut state = self.lock();
            if state.progress >= 1.0 || clamped < state.progress {
                return;
            }
            state.progress = clamped;
            if clamped >= 1.0 {
                state.on_done.take()
            } else {
                None
            }
        };

        if let Some(signals) = &self.signals {
            let signal = ReporterSignal {
                ticket: self.ticket,
                progress: clamped,
            };
            if let Err(TrySendError::Full(_)) = signals.try_send(signal) {
                trace!("Progress signal {:.2} for ticket {} dropped, channel full", clamped, self.ticket);
            }
        }

        if let Some(callback) = on_done {
            callback();
        }
    }

    /// Marks the transition as finished (progress `1.0`).
    pub fn complete(&self) {
        self.update_progress(1.0);
    }

    //--- Queries ----------------------------------------------------------

    /// Returns the current progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.lock().progress
    }

    /// Returns true once progress has reached `1.0`.
    pub fn is_done(&self) -> bool {
        self.progress() >= 1.0
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        // The guarded value is a plain float; a poisoned lock still holds it.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("ticket", &self.ticket)
            .field("progress", &self.progress())
            .field("attached", &self.signals.is_some())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
