//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use state_stack_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// State stacks
pub use crate::core::state::{
    state_ref, ApplicationState, ProgressReporter, StackAction, StateId, StateKey, StateRef,
    StateStack, StateStackBuilder, TypedStateStack,
};

// Errors
pub use crate::core::state::{StackError, TypedStackError};

// Events
pub use crate::core::state::{StackChange, StackOperationEvent, StackProgress, StackProgressEvent};

// Scene system
pub use crate::core::scene::{
    LoadProgress, QueueError, SceneAction, SceneActionKind, SceneActionsQueue, SceneGroupState,
    SceneLoadService, ScenePreloader,
};

// Debugging
pub use crate::core::debug::StackMonitor;
