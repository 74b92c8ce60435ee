//=========================================================================
// State System
//=========================================================================
//
// Stack of application states with serial, reporter-gated transitions.
//
// Architecture:
//   TypedStateStack<K>
//     ├─ registry: K <-> StateRef
//     └─ StateStack
//          ├─ states: Vec<StateRef>        (last = current)
//          └─ pending: plan of steps      (one Invoke at a time)
//
// Flow:
//   push/pop/set → plan → change_state(action, reporter)
//                       → reporter done → next step → on_complete → event
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

//=== Module Declarations =================================================

mod error;
mod events;
mod progress;
mod state_stack;
mod typed_stack;

//=== Public API ==========================================================

pub use error::{StackError, TypedStackError};
pub use events::{StackChange, StackOperationEvent, StackProgress, StackProgressEvent};
pub use progress::ProgressReporter;
pub use state_stack::{StateStack, StateStackBuilder};
pub use typed_stack::{StateKeys, TypedStateStack};

pub(crate) use progress::ReporterSignal;

//=== Stack Action ========================================================

/// Why a state's [`ApplicationState::change_state`] is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackAction {
    /// The state was placed on top of the stack.
    Added,

    /// The state is leaving the stack.
    Removed,

    /// A new state is being pushed above this one.
    Paused,

    /// The state above this one was popped; this state is current again.
    Resumed,
}

//=== Application State Trait =============================================

/// A unit of behavior living at a position of a [`StateStack`].
///
/// Transitions are fire-and-forget: the stack hands the state a
/// [`ProgressReporter`] and waits until the reporter reaches `1.0`
/// before invoking the next state. Completing the reporter inside
/// `change_state` finishes the step immediately.
///
/// # Minimal Implementation
///
/// ```rust
/// # use state_stack_engine::prelude::*;
/// struct MenuState;
///
/// impl ApplicationState for MenuState {
///     fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
///         reporter.complete();
///     }
/// }
/// ```
pub trait ApplicationState {
    /// Reacts to a stack transition and signals completion through `reporter`.
    fn change_state(&mut self, action: StackAction, reporter: ProgressReporter);

    /// Called once per stack tick while the state is on the stack.
    ///
    /// Default implementation does nothing. Override to drive deferred
    /// work (animations, scene loads) that completes a held reporter.
    fn update(&mut self) {}

    /// Human readable name used in log output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

//=== State References ====================================================

/// Shared handle to a registered state.
///
/// The caller keeps ownership of the state; stacks only hold clones of
/// the handle and never drop the last one on their own.
pub type StateRef = Rc<RefCell<dyn ApplicationState>>;

/// Wraps a state into a [`StateRef`].
pub fn state_ref<S>(state: S) -> StateRef
where
    S: ApplicationState + 'static,
{
    Rc::new(RefCell::new(state))
}

/// Identity of a state instance, stable for as long as the instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Returns the identity of the instance behind `state`.
    pub fn of(state: &StateRef) -> Self {
        Self(Rc::as_ptr(state) as *const () as usize)
    }
}

//=== State Key Trait =====================================================

/// Marker trait for state identifiers.
///
/// State keys map 1:1 onto registered states in a [`TypedStateStack`].
/// Typically implemented by game-specific enums.
pub trait StateKey: Clone + Copy + Eq + Hash + Debug + Send + 'static {}

//=== Tests ===============================================================
