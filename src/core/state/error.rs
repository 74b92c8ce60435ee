//=========================================================================
// State Stack Errors
//=========================================================================
//
// Contract violations reported by the untyped and typed stacks.
//
// Benign conditions (popping an empty stack, pushing the current state)
// are not errors and never show up here.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use super::{StateId, StateKey};

//=== StackError ==========================================================

/// Errors raised by [`super::StateStack`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A push/pop/set was issued while a previous operation is still running.
    #[error("stack `{stack}` is still running a previous operation, {requested} rejected")]
    OperationInFlight {
        stack: String,
        requested: &'static str,
    },

    /// The state is already on the stack below the current top.
    #[error("state {state:?} is already on stack `{stack}`")]
    AlreadyActive { stack: String, state: StateId },
}

//=== TypedStackError =====================================================

/// Errors raised by [`super::TypedStateStack`] registration and operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypedStackError<K: StateKey> {
    /// The key already has a registered state.
    #[error("state key {0:?} is already registered")]
    DuplicateKey(K),

    /// The state instance is already registered under another key.
    #[error("state instance is already registered as {existing:?}, cannot register it as {requested:?}")]
    DuplicateState { existing: K, requested: K },

    /// The key was never registered.
    #[error("state key {0:?} is not registered")]
    UnregisteredKey(K),

    /// The key's state is already on the stack below the current top.
    #[error("state {0:?} is already on the stack")]
    AlreadyActive(K),

    #[error(transparent)]
    Stack(#[from] StackError),
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKey {
        Menu,
    }

    impl StateKey for TestKey {}

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<StackError>();
        assert_error::<TypedStackError<TestKey>>();
    }

    #[test]
    fn in_flight_message_names_stack_and_operation() {
        let error = StackError::OperationInFlight {
            stack: "ui".to_string(),
            requested: "push",
        };
        assert_eq!(
            error.to_string(),
            "stack `ui` is still running a previous operation, push rejected"
        );
    }

    #[test]
    fn typed_error_wraps_stack_error() {
        let inner = StackError::OperationInFlight {
            stack: "ui".to_string(),
            requested: "pop",
        };
        let error: TypedStackError<TestKey> = inner.clone().into();

        assert_eq!(error, TypedStackError::Stack(inner.clone()));
        assert_eq!(error.to_string(), inner.to_string());
    }

    #[test]
    fn key_errors_print_key() {
        let error = TypedStackError::UnregisteredKey(TestKey::Menu);
        assert_eq!(error.to_string(), "state key Menu is not registered");
    }
}
