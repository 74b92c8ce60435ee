//=========================================================================
// Stack Monitor
//=========================================================================
//
// Headless model of a stack visualizer.
//
// Architecture:
//   TypedStateStack ── listener ──> try_send(MonitorEntry) ──┐
//                                                           │ bounded channel
//   StackMonitor::poll() <──────────────────────────────────┘
//     ├─ history (bounded)
//     ├─ stack snapshot
//     └─ in-flight transition (key, action, progress)
//
// The monitor owns copies of every event, so nothing it keeps refers
// back into the stack. It can be polled from a different thread.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;
use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::state::{StackAction, StackOperationEvent, StackProgressEvent, StateKey};

//=== MonitorEntry ========================================================

/// Owned copy of a stack notification.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEntry<K: StateKey> {
    /// A push, pop or set completed.
    Changed {
        operation: StackAction,
        state: K,
        old_stack: Vec<K>,
        new_stack: Vec<K>,
    },

    /// A transitioning state reported progress.
    Progress {
        state: K,
        action: StackAction,
        progress: f32,
    },
}

/// Transition currently shown as "in progress".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InFlight<K: StateKey> {
    /// Key of the transitioning state.
    pub state: K,

    /// The action being applied to it.
    pub action: StackAction,

    /// Last reported progress.
    pub progress: f32,
}

//=== StackMonitor ========================================================

/// Collects stack notifications for display.
///
/// Created through [`crate::core::state::TypedStateStack::monitor`].
/// A transition that never completes shows up as a permanent
/// [`StackMonitor::in_flight`] entry.
pub struct StackMonitor<K: StateKey> {
    receiver: Receiver<MonitorEntry<K>>,
    history: VecDeque<MonitorEntry<K>>,
    history_limit: usize,
    stack: Vec<K>,
    in_flight: Option<InFlight<K>>,
    disconnected: bool,
}

impl<K: StateKey> StackMonitor<K> {
    /// Most entries consumed by a single [`StackMonitor::poll`].
    pub const MAX_ENTRIES_PER_POLL: usize = 100;

    //--- Construction -----------------------------------------------------

    /// Creates a monitor plus the two listeners that feed it.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub(crate) fn attach(
        capacity: usize,
        initial_stack: Vec<K>,
    ) -> (
        Self,
        impl FnMut(&StackOperationEvent<K>) + 'static,
        impl FnMut(&StackProgressEvent<K>) + 'static,
    ) {
        assert!(capacity > 0, "Monitor capacity must be positive");

        let (sender, receiver) = bounded(capacity);

        let change_sender = sender.clone();
        let mut change_connected = true;
        let on_change = move |event: &StackOperationEvent<K>| {
            if !change_connected {
                return;
            }
            let entry = MonitorEntry::Changed {
                operation: event.operation(),
                state: event.state(),
                old_stack: event.old_stack().to_vec(),
                new_stack: event.new_stack().to_vec(),
            };
            change_connected = forward(&change_sender, entry);
        };

        let mut progress_connected = true;
        let on_progress = move |event: &StackProgressEvent<K>| {
            if !progress_connected {
                return;
            }
            let entry = MonitorEntry::Progress {
                state: event.state,
                action: event.action,
                progress: event.progress,
            };
            progress_connected = forward(&sender, entry);
        };

        let monitor = Self {
            receiver,
            history: VecDeque::with_capacity(capacity),
            history_limit: capacity,
            stack: initial_stack,
            in_flight: None,
            disconnected: false,
        };

        (monitor, on_change, on_progress)
    }

    /// Sets how many entries [`StackMonitor::history`] retains.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    //--- Polling ----------------------------------------------------------

    /// Drains pending entries (bounded per call) and returns how many were read.
    pub fn poll(&mut self) -> usize {
        let mut drained = 0;

        while drained < Self::MAX_ENTRIES_PER_POLL {
            match self.receiver.try_recv() {
                Ok(entry) => {
                    self.apply(entry);
                    drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        debug!("Stack monitor source dropped");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }

        if drained >= Self::MAX_ENTRIES_PER_POLL {
            warn!("Stack monitor backlog: drained {} entries this poll", drained);
        }

        drained
    }

    fn apply(&mut self, entry: MonitorEntry<K>) {
        match &entry {
            MonitorEntry::Changed { new_stack, .. } => {
                self.stack = new_stack.clone();
                self.in_flight = None;
            }
            MonitorEntry::Progress {
                state,
                action,
                progress,
            } => {
                self.in_flight = Some(InFlight {
                    state: *state,
                    action: *action,
                    progress: *progress,
                });
            }
        }

        self.history.push_back(entry);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Stack as of the last completed operation, bottom to top.
    pub fn stack(&self) -> &[K] {
        &self.stack
    }

    /// Last progress seen since the last completed operation.
    pub fn in_flight(&self) -> Option<InFlight<K>> {
        self.in_flight
    }

    /// Retained entries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &MonitorEntry<K>> {
        self.history.iter()
    }

    /// Returns true once the observed stack has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Sends `entry`; returns false once the monitor is gone.
fn forward<K: StateKey>(sender: &Sender<MonitorEntry<K>>, entry: MonitorEntry<K>) -> bool {
    match sender.try_send(entry) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!("Stack monitor full, entry dropped");
            true
        }
        Err(TrySendError::Disconnected(_)) => {
            debug!("Stack monitor dropped, detaching");
            false
        }
    }
}

//=== Display =============================================================
//
// One-line summary for debug overlays:
//
// ```text
// [Menu, Game] | Added Game 40%
// ```
//
impl<K: StateKey> fmt::Display for StackMonitor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.stack)?;
        if let Some(flight) = &self.in_flight {
            write!(
                f,
                " | {:?} {:?} {:.0}%",
                flight.action,
                flight.state,
                flight.progress * 100.0
            )?;
        }
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::core::state::{ApplicationState, ProgressReporter, TypedStateStack};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Screen {
        Menu,
        Game,
    }

    impl StateKey for Screen {}

    struct Held(Option<ProgressReporter>);

    impl ApplicationState for Held {
        fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
            self.0 = Some(reporter);
        }
    }

    struct Instant;

    impl ApplicationState for Instant {
        fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
            reporter.complete();
        }
    }

    #[test]
    fn monitor_tracks_stack_snapshots() {
        let mut stack = TypedStateStack::new();
        stack.register(Screen::Menu, Instant).unwrap();
        stack.register(Screen::Game, Instant).unwrap();
        let mut monitor = stack.monitor(16);

        stack.set(Screen::Menu).unwrap();
        stack.push(Screen::Game).unwrap();

        // Each instant transition reports 1.0 before the change lands.
        assert_eq!(monitor.poll(), 5);
        assert_eq!(monitor.stack(), &[Screen::Menu, Screen::Game]);
        assert!(monitor.in_flight().is_none());
        assert_eq!(monitor.to_string(), "[Menu, Game]");
    }

    #[test]
    fn monitor_shows_stalled_transition() {
        let mut stack = TypedStateStack::new();
        stack.register(Screen::Menu, Instant).unwrap();
        let game = Rc::new(RefCell::new(Held(None)));
        stack.register_state(Screen::Game, game.clone()).unwrap();
        stack.set(Screen::Menu).unwrap();
        let mut monitor = stack.monitor(16);

        stack.push(Screen::Game).unwrap();
        game.borrow().0.as_ref().unwrap().update_progress(0.4);
        stack.update();
        monitor.poll();

        assert_eq!(
            monitor.in_flight(),
            Some(InFlight {
                state: Screen::Game,
                action: StackAction::Added,
                progress: 0.4,
            })
        );
        assert_eq!(monitor.stack(), &[Screen::Menu]);
        assert_eq!(monitor.to_string(), "[Menu] | Added Game 40%");
    }

    #[test]
    fn monitor_history_is_bounded() {
        let mut stack = TypedStateStack::new();
        stack.register(Screen::Menu, Instant).unwrap();
        stack.register(Screen::Game, Instant).unwrap();
        let mut monitor = stack.monitor(16).with_history_limit(2);

        stack.set(Screen::Menu).unwrap();
        stack.push(Screen::Game).unwrap();
        stack.pop().unwrap();
        monitor.poll();

        let history: Vec<_> = monitor.history().collect();
        assert_eq!(history.len(), 2);
        assert!(matches!(
            history[1],
            MonitorEntry::Changed {
                operation: StackAction::Removed,
                state: Screen::Game,
                ..
            }
        ));
    }

    #[test]
    fn full_channel_drops_newest_entries() {
        let mut stack = TypedStateStack::new();
        stack.register(Screen::Menu, Instant).unwrap();
        stack.register(Screen::Game, Instant).unwrap();
        let mut monitor = stack.monitor(1);

        stack.set(Screen::Menu).unwrap();
        stack.push(Screen::Game).unwrap();

        assert_eq!(monitor.poll(), 1);
        assert!(monitor.stack().is_empty());
        assert_eq!(monitor.in_flight().map(|flight| flight.state), Some(Screen::Menu));
    }

    #[test]
    fn dropped_stack_disconnects_monitor() {
        let mut stack = TypedStateStack::<Screen>::new();
        let mut monitor = stack.monitor(4);
        drop(stack);

        assert_eq!(monitor.poll(), 0);
        assert!(monitor.is_disconnected());
    }

    #[test]
    fn dropped_monitor_does_not_disturb_stack() {
        let mut stack = TypedStateStack::new();
        stack.register(Screen::Menu, Instant).unwrap();
        let monitor = stack.monitor(4);
        drop(monitor);

        stack.set(Screen::Menu).unwrap();
        assert!(stack.is_current(Screen::Menu));
    }

    #[test]
    #[should_panic(expected = "Monitor capacity must be positive")]
    fn zero_capacity_panics() {
        let mut stack = TypedStateStack::<Screen>::new();
        stack.monitor(0);
    }
}
