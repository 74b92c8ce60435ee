//=========================================================================
// Stack Events
//=========================================================================
//
// Notifications describing what a stack operation changed.
//
// Untyped events identify states by StateId; the typed stack translates
// them into key-based events before handing them to its listeners.
//
// Listeners receive events by reference for the duration of the call.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{StackAction, StateId, StateKey};

//=== Listener Types ======================================================

pub(crate) type ChangeListener = Box<dyn FnMut(&StackChange)>;
pub(crate) type ProgressListener = Box<dyn FnMut(&StackProgress)>;

//=== Untyped Events ======================================================

/// A completed push, pop or set on a [`super::StateStack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackChange {
    /// `Added` for push and set, `Removed` for pop.
    pub operation: StackAction,

    /// The pushed, popped or set state.
    pub state: StateId,

    /// Active states before the operation, bottom to top.
    pub old_stack: Vec<StateId>,

    /// Active states after the operation, bottom to top.
    pub new_stack: Vec<StateId>,
}

/// Progress reported by the state currently transitioning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackProgress {
    /// The transitioning state.
    pub state: StateId,

    /// The action being applied to it.
    pub action: StackAction,

    /// Clamped progress in `[0, 1]`.
    pub progress: f32,
}

//=== Typed Events ========================================================

/// A completed stack operation expressed in state keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOperationEvent<K: StateKey> {
    operation: StackAction,
    state: K,
    old_stack: Vec<K>,
    new_stack: Vec<K>,
}

impl<K: StateKey> StackOperationEvent<K> {
    pub(crate) fn new(operation: StackAction, state: K, old_stack: Vec<K>, new_stack: Vec<K>) -> Self {
        Self {
            operation,
            state,
            old_stack,
            new_stack,
        }
    }

    /// The action that triggered the event.
    pub fn operation(&self) -> StackAction {
        self.operation
    }

    /// The key that was pushed, popped or set.
    pub fn state(&self) -> K {
        self.state
    }

    /// Keys on the stack before the operation, bottom to top.
    pub fn old_stack(&self) -> &[K] {
        &self.old_stack
    }

    /// Keys on the stack after the operation, bottom to top.
    pub fn new_stack(&self) -> &[K] {
        &self.new_stack
    }
}

/// Progress of a keyed state's transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackProgressEvent<K: StateKey> {
    /// Key of the transitioning state.
    pub state: K,

    /// The action being applied to it.
    pub action: StackAction,

    /// Clamped progress in `[0, 1]`.
    pub progress: f32,
}
