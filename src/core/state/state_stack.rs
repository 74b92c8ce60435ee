//=========================================================================
// State Stack
//=========================================================================
//
// Untyped stack of application states with serial transitions.
//
// Every push/pop/set is expanded into a plan of steps. Steps run one at
// a time; an Invoke step hands the state a reporter and blocks the plan
// until that reporter is done.
//
//   push(C) on [A, B]:  Paused(A) → Paused(B) → append C → Added(C) → finish
//   pop()   on [A, B]:  Removed(B) → drop B → Resumed(A) → finish
//   set(C)  on [A, B]:  Removed(A) → Removed(B) → clear → append C → Added(C) → finish
//
// update() is the per-tick pump: ticks states, drains reporter signals
// and advances the plan.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;
use std::rc::Rc;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use super::events::{ChangeListener, ProgressListener};
use super::{
    ProgressReporter, ReporterSignal, StackAction, StackChange, StackError, StackProgress,
    StateId, StateRef,
};

//=== StateStackBuilder ===================================================

/// Builder for configuring and constructing a [`StateStack`].
///
/// # Default Values
///
/// - **Name**: `"stack"` (used in log output and errors)
/// - **Signal capacity**: 128 progress signals buffered between ticks
///
/// # Examples
///
/// ```rust
/// use state_stack_engine::prelude::*;
///
/// let stack = StateStackBuilder::new()
///     .with_name("ui")
///     .with_signal_capacity(32)
///     .build();
///
/// assert_eq!(stack.name(), "ui");
/// assert!(stack.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct StateStackBuilder {
    name: String,
    signal_capacity: usize,
}

impl StateStackBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "stack".to_string(),
            signal_capacity: 128,
        }
    }

    /// Sets the stack name shown in logs and errors.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets how many progress signals may queue up between two ticks.
    ///
    /// Signals beyond the capacity are dropped. Completion is never lost,
    /// since it is read from the reporter itself.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_signal_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Signal capacity must be positive");
        self.signal_capacity = capacity;
        self
    }

    /// Builds the stack.
    pub fn build(self) -> StateStack {
        info!(
            "Building state stack `{}` (signal capacity: {})",
            self.name, self.signal_capacity
        );

        let (signal_tx, signal_rx) = bounded(self.signal_capacity);

        StateStack {
            name: self.name,
            states: Vec::new(),
            pending: None,
            next_ticket: 1,
            signal_tx,
            signal_rx,
            change_listeners: Vec::new(),
            progress_listeners: Vec::new(),
        }
    }
}

impl Default for StateStackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Operation Plan ======================================================

enum Step {
    Invoke { state: StateRef, action: StackAction },
    Append(StateRef),
    RemoveTop,
    Clear,
    Finish,
}

enum Completion {
    Unit(Box<dyn FnOnce()>),
    Popped(Box<dyn FnOnce(Option<StateRef>)>),
}

struct Waiting {
    reporter: ProgressReporter,
    state: StateId,
    action: StackAction,
}

struct PendingOperation {
    operation: StackAction,
    subject: StateId,
    old_stack: Vec<StateId>,
    steps: VecDeque<Step>,
    waiting: Option<Waiting>,
    removed: Option<StateRef>,
    completion: Completion,
}

//=== StateStack ==========================================================

/// Ordered set of active states; the last entry is the current state.
///
/// Only one operation runs at a time. Calls issued while a previous
/// operation is still waiting on a reporter are rejected with
/// [`StackError::OperationInFlight`].
///
/// Completion callbacks and listeners run while the stack is mutably
/// borrowed, so they cannot issue stack operations themselves.
pub struct StateStack {
    name: String,
    states: Vec<StateRef>,
    pending: Option<PendingOperation>,
    next_ticket: u64,
    signal_tx: Sender<ReporterSignal>,
    signal_rx: Receiver<ReporterSignal>,
    change_listeners: Vec<ChangeListener>,
    progress_listeners: Vec<ProgressListener>,
}

impl StateStack {
    //--- Construction -----------------------------------------------------

    /// Creates an empty stack with default settings.
    pub fn new() -> Self {
        StateStackBuilder::new().build()
    }

    /// Returns a builder for custom settings.
    pub fn builder() -> StateStackBuilder {
        StateStackBuilder::new()
    }

    //--- Listeners --------------------------------------------------------

    /// Registers a listener fired after every completed push, pop or set.
    pub fn on_stack_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&StackChange) + 'static,
    {
        self.change_listeners.push(Box::new(listener));
    }

    /// Registers a listener fired for progress reported by transitioning states.
    pub fn on_progress<F>(&mut self, listener: F)
    where
        F: FnMut(&StackProgress) + 'static,
    {
        self.progress_listeners.push(Box::new(listener));
    }

    //--- Stack Operations -------------------------------------------------

    /// Pauses every active state, then adds `state` on top.
    ///
    /// Pushing the current state completes immediately without invoking it.
    pub fn push<F>(&mut self, state: StateRef, on_complete: F) -> Result<(), StackError>
    where
        F: FnOnce() + 'static,
    {
        self.ensure_idle("push")?;

        if self.is_current(&state) {
            debug!("[{}] {} is already current, push skipped", self.name, state.borrow().name());
            on_complete();
            return Ok(());
        }

        if self.contains(&state) {
            warn!("[{}] {} is already on the stack, push rejected", self.name, state.borrow().name());
            return Err(StackError::AlreadyActive {
                stack: self.name.clone(),
                state: StateId::of(&state),
            });
        }

        let mut steps: VecDeque<Step> = self
            .states
            .iter()
            .map(|active| Step::Invoke {
                state: Rc::clone(active),
                action: StackAction::Paused,
            })
            .collect();
        steps.push_back(Step::Append(Rc::clone(&state)));
        steps.push_back(Step::Invoke {
            state: Rc::clone(&state),
            action: StackAction::Added,
        });
        steps.push_back(Step::Finish);

        debug!("[{}] Pushing {}", self.name, state.borrow().name());
        self.begin(StackAction::Added, &state, steps, Completion::Unit(Box::new(on_complete)));
        Ok(())
    }

    /// Removes the current state and resumes the one below it.
    ///
    /// On an empty stack `on_complete(None)` runs immediately.
    pub fn pop<F>(&mut self, on_complete: F) -> Result<(), StackError>
    where
        F: FnOnce(Option<StateRef>) + 'static,
    {
        self.ensure_idle("pop")?;

        let Some(top) = self.states.last().cloned() else {
            debug!("[{}] Pop on empty stack", self.name);
            on_complete(None);
            return Ok(());
        };

        let mut steps = VecDeque::with_capacity(4);
        steps.push_back(Step::Invoke {
            state: Rc::clone(&top),
            action: StackAction::Removed,
        });
        steps.push_back(Step::RemoveTop);
        if let Some(below) = self.states.iter().rev().nth(1) {
            steps.push_back(Step::Invoke {
                state: Rc::clone(below),
                action: StackAction::Resumed,
            });
        }
        steps.push_back(Step::Finish);

        debug!("[{}] Popping {}", self.name, top.borrow().name());
        self.begin(StackAction::Removed, &top, steps, Completion::Popped(Box::new(on_complete)));
        Ok(())
    }

    /// Removes every active state, then makes `state` the only entry.
    ///
    /// Completes immediately if `state` is already the sole entry.
    pub fn set<F>(&mut self, state: StateRef, on_complete: F) -> Result<(), StackError>
    where
        F: FnOnce() + 'static,
    {
        self.ensure_idle("set")?;

        if self.states.len() == 1 && self.is_current(&state) {
            debug!("[{}] {} is already the only state, set skipped", self.name, state.borrow().name());
            on_complete();
            return Ok(());
        }

        let mut steps: VecDeque<Step> = self
            .states
            .iter()
            .map(|active| Step::Invoke {
                state: Rc::clone(active),
                action: StackAction::Removed,
            })
            .collect();
        steps.push_back(Step::Clear);
        steps.push_back(Step::Append(Rc::clone(&state)));
        steps.push_back(Step::Invoke {
            state: Rc::clone(&state),
            action: StackAction::Added,
        });
        steps.push_back(Step::Finish);

        debug!("[{}] Setting {}", self.name, state.borrow().name());
        self.begin(StackAction::Added, &state, steps, Completion::Unit(Box::new(on_complete)));
        Ok(())
    }

    //--- Update Loop ------------------------------------------------------

    /// Ticks every active state, then advances the running operation.
    pub fn update(&mut self) {
        for state in &self.states {
            state.borrow_mut().update();
        }

        self.drive();
    }

    //--- Queries ----------------------------------------------------------

    /// Stack name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active states, bottom to top.
    pub fn states(&self) -> &[StateRef] {
        &self.states
    }

    /// The current (top) state.
    pub fn current(&self) -> Option<&StateRef> {
        self.states.last()
    }

    /// Returns true if `state` is the current state.
    pub fn is_current(&self, state: &StateRef) -> bool {
        self.current().is_some_and(|top| Rc::ptr_eq(top, state))
    }

    /// Returns true if `state` is anywhere on the stack.
    pub fn contains(&self, state: &StateRef) -> bool {
        self.states.iter().any(|active| Rc::ptr_eq(active, state))
    }

    /// Number of active states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no state is active.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns true while an operation is waiting on a reporter.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    //--- Internal Helpers -------------------------------------------------

    fn ensure_idle(&self, requested: &'static str) -> Result<(), StackError> {
        if self.pending.is_some() {
            warn!("[{}] {} rejected, previous operation still running", self.name, requested);
            return Err(StackError::OperationInFlight {
                stack: self.name.clone(),
                requested,
            });
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<StateId> {
        self.states.iter().map(StateId::of).collect()
    }

    fn begin(
        &mut self,
        operation: StackAction,
        subject: &StateRef,
        steps: VecDeque<Step>,
        completion: Completion,
    ) {
        self.pending = Some(PendingOperation {
            operation,
            subject: StateId::of(subject),
            old_stack: self.snapshot(),
            steps,
            waiting: None,
            removed: None,
            completion,
        });

        self.drive();
    }

    /// Runs plan steps until one is waiting on an unfinished reporter.
    fn drive(&mut self) {
        loop {
            self.pump_signals();

            let step = {
                let Some(pending) = self.pending.as_mut() else {
                    return;
                };

                if let Some(waiting) = &pending.waiting {
                    if !waiting.reporter.is_done() {
                        return;
                    }
                    debug!("[{}] {:?} acknowledged by {:?}", self.name, waiting.action, waiting.state);
                    pending.waiting = None;
                }

                pending.steps.pop_front().unwrap_or(Step::Finish)
            };

            match step {
                Step::Invoke { state, action } => self.invoke(state, action),
                Step::Append(state) => self.states.push(state),
                Step::RemoveTop => {
                    let removed = self.states.pop();
                    if let Some(pending) = self.pending.as_mut() {
                        pending.removed = removed;
                    }
                }
                Step::Clear => self.states.clear(),
                Step::Finish => self.finish(),
            }
        }
    }

    fn invoke(&mut self, state: StateRef, action: StackAction) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let reporter = ProgressReporter::attached(ticket, self.signal_tx.clone());
        if let Some(pending) = self.pending.as_mut() {
            pending.waiting = Some(Waiting {
                reporter: reporter.clone(),
                state: StateId::of(&state),
                action,
            });
        }

        debug!("[{}] {:?} -> {}", self.name, action, state.borrow().name());
        state.borrow_mut().change_state(action, reporter);
    }

    /// Forwards progress of the waiting reporter; stale tickets are skipped.
    fn pump_signals(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            let Some(waiting) = self.pending.as_ref().and_then(|p| p.waiting.as_ref()) else {
                continue;
            };
            if waiting.reporter.ticket() != signal.ticket {
                continue;
            }

            let event = StackProgress {
                state: waiting.state,
                action: waiting.action,
                progress: signal.progress,
            };
            for listener in &mut self.progress_listeners {
                listener(&event);
            }
        }
    }

    fn finish(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let change = StackChange {
            operation: pending.operation,
            state: pending.subject,
            old_stack: pending.old_stack,
            new_stack: self.snapshot(),
        };
        debug!(
            "[{}] {:?} finished, {} state(s) active",
            self.name,
            change.operation,
            change.new_stack.len()
        );

        match pending.completion {
            Completion::Unit(on_complete) => on_complete(),
            Completion::Popped(on_complete) => on_complete(pending.removed),
        }

        for listener in &mut self.change_listeners {
            listener(&change);
        }
    }
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::core::state::{state_ref, ApplicationState};

    //--- Test Doubles -----------------------------------------------------

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every transition; completes immediately unless deferred.
    struct Recording {
        label: &'static str,
        log: Log,
        deferred: bool,
        held: Option<ProgressReporter>,
        ticks: usize,
    }

    impl ApplicationState for Recording {
        fn change_state(&mut self, action: StackAction, reporter: ProgressReporter) {
            self.log.borrow_mut().push(format!("{}.{:?}", self.label, action));
            if self.deferred {
                self.held = Some(reporter);
            } else {
                reporter.complete();
            }
        }

        fn update(&mut self) {
            self.ticks += 1;
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct Fixture {
        log: Log,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn state(&self, label: &'static str) -> (StateRef, Rc<RefCell<Recording>>) {
            self.build(label, false)
        }

        fn deferred(&self, label: &'static str) -> (StateRef, Rc<RefCell<Recording>>) {
            self.build(label, true)
        }

        fn build(&self, label: &'static str, deferred: bool) -> (StateRef, Rc<RefCell<Recording>>) {
            let concrete = Rc::new(RefCell::new(Recording {
                label,
                log: Rc::clone(&self.log),
                deferred,
                held: None,
                ticks: 0,
            }));
            let handle: StateRef = concrete.clone();
            (handle, concrete)
        }

        fn take_log(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.borrow_mut())
        }
    }

    fn release(state: &Rc<RefCell<Recording>>) {
        let reporter = state.borrow_mut().held.take().expect("state holds no reporter");
        reporter.complete();
    }

    fn ids(states: &[&StateRef]) -> Vec<StateId> {
        states.iter().map(|s| StateId::of(s)).collect()
    }

    //--- Builder Tests ----------------------------------------------------

    #[test]
    fn builder_defaults() {
        let builder = StateStackBuilder::new();
        assert_eq!(builder.name, "stack");
        assert_eq!(builder.signal_capacity, 128);
    }

    #[test]
    fn builder_fluent_api_chaining() {
        let builder = StateStackBuilder::new().with_name("hud").with_signal_capacity(8);
        assert_eq!(builder.name, "hud");
        assert_eq!(builder.signal_capacity, 8);
        assert_eq!(builder.build().name(), "hud");
    }

    #[test]
    #[should_panic(expected = "Signal capacity must be positive")]
    fn builder_with_signal_capacity_panics_on_zero() {
        StateStackBuilder::new().with_signal_capacity(0);
    }

    //--- Push Tests -------------------------------------------------------

    #[test]
    fn push_pauses_every_state_bottom_to_top_then_adds() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, _) = fx.state("B");
        let (c, _) = fx.state("C");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        stack.push(b.clone(), || {}).unwrap();
        fx.take_log();

        stack.push(c.clone(), || {}).unwrap();

        assert_eq!(fx.take_log(), vec!["A.Paused", "B.Paused", "C.Added"]);
        assert_eq!(ids(&stack.states().iter().collect::<Vec<_>>()), ids(&[&a, &b, &c]));
        assert!(stack.is_current(&c));
    }

    #[test]
    fn push_waits_for_each_reporter_in_turn() {
        let fx = Fixture::new();
        let (a, a_rec) = fx.deferred("A");
        let (b, b_rec) = fx.deferred("B");
        let (c, c_rec) = fx.deferred("C");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        release(&a_rec);
        stack.update();
        stack.push(b.clone(), || {}).unwrap();
        release(&a_rec);
        stack.update();
        release(&b_rec);
        stack.update();
        fx.take_log();

        let done = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&done);
        stack.push(c.clone(), move || *flag.borrow_mut() = true).unwrap();
        assert_eq!(fx.take_log(), vec!["A.Paused"]);

        // Nothing moves until A acknowledges.
        stack.update();
        assert!(fx.take_log().is_empty());

        release(&a_rec);
        stack.update();
        assert_eq!(fx.take_log(), vec!["B.Paused"]);
        assert_eq!(stack.len(), 2);

        release(&b_rec);
        stack.update();
        assert_eq!(fx.take_log(), vec!["C.Added"]);
        assert_eq!(stack.len(), 3);
        assert!(!*done.borrow());
        assert!(stack.is_busy());

        release(&c_rec);
        stack.update();
        assert!(*done.borrow());
        assert!(!stack.is_busy());
    }

    #[test]
    fn push_of_current_state_is_noop() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        fx.take_log();

        let changes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&changes);
        stack.on_stack_changed(move |_| *counter.borrow_mut() += 1);

        let done = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&done);
        stack.push(a.clone(), move || *flag.borrow_mut() = true).unwrap();

        assert!(*done.borrow());
        assert!(fx.take_log().is_empty());
        assert_eq!(stack.len(), 1);
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn push_of_state_below_top_is_rejected() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, _) = fx.state("B");
        let mut stack = StateStack::builder().with_name("ui").build();

        stack.push(a.clone(), || {}).unwrap();
        stack.push(b.clone(), || {}).unwrap();

        let result = stack.push(a.clone(), || {});
        assert_eq!(
            result,
            Err(StackError::AlreadyActive {
                stack: "ui".to_string(),
                state: StateId::of(&a),
            })
        );
        assert_eq!(stack.len(), 2);
    }

    //--- Pop Tests --------------------------------------------------------

    #[test]
    fn pop_on_empty_stack_completes_with_none() {
        let mut stack = StateStack::new();
        let result = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&result);

        stack
            .pop(move |removed| *slot.borrow_mut() = Some(removed.is_none()))
            .unwrap();

        assert_eq!(*result.borrow(), Some(true));
        assert!(!stack.is_busy());
    }

    #[test]
    fn pop_removes_top_then_resumes_new_top() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, _) = fx.state("B");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        stack.push(b.clone(), || {}).unwrap();
        fx.take_log();

        let popped = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&popped);
        stack
            .pop(move |removed| *slot.borrow_mut() = removed.map(|s| StateId::of(&s)))
            .unwrap();

        assert_eq!(fx.take_log(), vec!["B.Removed", "A.Resumed"]);
        assert_eq!(*popped.borrow(), Some(StateId::of(&b)));
        assert!(stack.is_current(&a));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn pop_waits_for_removal_before_resuming() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, b_rec) = fx.deferred("B");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        stack.push(b.clone(), || {}).unwrap();
        release(&b_rec);
        stack.update();
        fx.take_log();

        stack.pop(|_| {}).unwrap();
        assert_eq!(fx.take_log(), vec!["B.Removed"]);
        assert_eq!(stack.len(), 2);

        release(&b_rec);
        stack.update();
        assert_eq!(fx.take_log(), vec!["A.Resumed"]);
        assert_eq!(stack.len(), 1);
        assert!(!stack.is_busy());
    }

    #[test]
    fn pop_of_last_state_leaves_empty_stack() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        fx.take_log();
        stack.pop(|removed| assert!(removed.is_some())).unwrap();

        assert_eq!(fx.take_log(), vec!["A.Removed"]);
        assert!(stack.is_empty());
    }

    //--- Set Tests --------------------------------------------------------

    #[test]
    fn set_removes_everything_then_adds() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, _) = fx.state("B");
        let (c, _) = fx.state("C");
        let mut stack = StateStack::new();

        stack.push(a.clone(), || {}).unwrap();
        stack.push(b.clone(), || {}).unwrap();
        fx.take_log();

        stack.set(c.clone(), || {}).unwrap();

        assert_eq!(fx.take_log(), vec!["A.Removed", "B.Removed", "C.Added"]);
        assert_eq!(stack.len(), 1);
        assert!(stack.is_current(&c));
    }

    #[test]
    fn set_of_sole_state_is_noop() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let mut stack = StateStack::new();

        stack.set(a.clone(), || {}).unwrap();
        fx.take_log();
        stack.set(a.clone(), || {}).unwrap();

        assert!(fx.take_log().is_empty());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn set_on_empty_stack_only_adds() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let mut stack = StateStack::new();

        stack.set(a.clone(), || {}).unwrap();

        assert_eq!(fx.take_log(), vec!["A.Added"]);
    }

    //--- Overlap Tests ----------------------------------------------------

    #[test]
    fn operations_are_rejected_while_busy() {
        let fx = Fixture::new();
        let (a, a_rec) = fx.deferred("A");
        let (b, _) = fx.state("B");
        let mut stack = StateStack::builder().with_name("flow").build();

        stack.push(a.clone(), || {}).unwrap();
        assert!(stack.is_busy());

        let expected = |requested| StackError::OperationInFlight {
            stack: "flow".to_string(),
            requested,
        };
        assert_eq!(stack.push(b.clone(), || {}), Err(expected("push")));
        assert_eq!(stack.pop(|_| {}), Err(expected("pop")));
        assert_eq!(stack.set(b.clone(), || {}), Err(expected("set")));

        release(&a_rec);
        stack.update();
        assert!(stack.push(b.clone(), || {}).is_ok());
    }

    //--- Event Tests ------------------------------------------------------

    #[test]
    fn change_event_fires_after_completion_with_snapshots() {
        let fx = Fixture::new();
        let (a, _) = fx.state("A");
        let (b, _) = fx.state("B");
        let mut stack = StateStack::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let events = Rc::clone(&order);
        stack.on_stack_changed(move |change| events.borrow_mut().push(format!("{:?}", change.operation)));

        stack.push(a.clone(), || {}).unwrap();

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        stack.on_stack_changed(move |change| sink.borrow_mut().push(change.clone()));

        let callback_order = Rc::clone(&order);
        stack
            .push(b.clone(), move || callback_order.borrow_mut().push("done".to_string()))
            .unwrap();

        assert_eq!(*order.borrow(), vec!["Added", "done", "Added"]);

        let changes = changes.borrow();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StackAction::Added);
        assert_eq!(changes[0].state, StateId::of(&b));
        assert_eq!(changes[0].old_stack, ids(&[&a]));
        assert_eq!(changes[0].new_stack, ids(&[&a, &b]));
    }

    #[test]
    fn pop_on_empty_stack_fires_no_event() {
        let mut stack = StateStack::new();
        let fired = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&fired);
        stack.on_stack_changed(move |_| *flag.borrow_mut() = true);

        stack.pop(|_| {}).unwrap();

        assert!(!*fired.borrow());
    }

    #[test]
    fn progress_of_waiting_state_is_forwarded() {
        let fx = Fixture::new();
        let (a, a_rec) = fx.deferred("A");
        let mut stack = StateStack::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        stack.on_progress(move |p| sink.borrow_mut().push((p.state, p.action, p.progress)));

        stack.push(a.clone(), || {}).unwrap();
        let reporter = a_rec.borrow().held.clone().unwrap();

        reporter.update_progress(0.25);
        stack.update();
        reporter.update_progress(3.0);
        stack.update();

        let id = StateId::of(&a);
        assert_eq!(
            *seen.borrow(),
            vec![(id, StackAction::Added, 0.25), (id, StackAction::Added, 1.0)]
        );
    }

    #[test]
    fn stale_reporter_updates_are_ignored() {
        let fx = Fixture::new();
        let (a, a_rec) = fx.deferred("A");
        let mut stack = StateStack::new();
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        stack.on_progress(move |_| *counter.borrow_mut() += 1);

        stack.push(a.clone(), || {}).unwrap();
        let old = a_rec.borrow().held.clone().unwrap();
        old.complete();
        stack.update();
        assert_eq!(*seen.borrow(), 1);

        // The finished reporter is frozen; nothing else is reported.
        old.update_progress(0.5);
        stack.update();
        assert_eq!(*seen.borrow(), 1);
    }

    //--- Update Tests -----------------------------------------------------

    #[test]
    fn update_ticks_every_active_state() {
        let fx = Fixture::new();
        let (a, a_rec) = fx.state("A");
        let (b, b_rec) = fx.state("B");
        let mut stack = StateStack::new();

        stack.push(a, || {}).unwrap();
        stack.push(b, || {}).unwrap();
        stack.update();
        stack.update();

        assert_eq!(a_rec.borrow().ticks, 2);
        assert_eq!(b_rec.borrow().ticks, 2);
    }

    #[test]
    fn helper_state_ref_is_accepted() {
        struct Quiet;
        impl ApplicationState for Quiet {
            fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
                reporter.complete();
            }
        }

        let mut stack = StateStack::new();
        let quiet = state_ref(Quiet);
        stack.push(quiet.clone(), || {}).unwrap();
        assert!(stack.is_current(&quiet));
    }
}
