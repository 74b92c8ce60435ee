//=========================================================================
// Typed State Stack
//=========================================================================
//
// Key-based facade over the untyped StateStack.
//
// Architecture:
//   TypedStateStack<K>
//     ├─ registry: Rc<RefCell<Registry<K>>>   K -> StateRef, StateId -> K
//     ├─ listeners: typed change/progress listeners
//     └─ stack: StateStack ── StackChange ──> translate ──> StackOperationEvent<K>
//
// States are registered once per key, 1:1, before any operation.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::slice;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{
    state_ref, ApplicationState, StackOperationEvent, StackProgressEvent, StateId, StateKey,
    StateRef, StateStack, StateStackBuilder, TypedStackError,
};
use crate::core::debug::StackMonitor;

//=== Registry ============================================================

struct Registry<K: StateKey> {
    states: HashMap<K, StateRef>,
    keys: HashMap<StateId, K>,
}

impl<K: StateKey> Registry<K> {
    fn new() -> Self {
        Self {
            states: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    fn key_of(&self, id: StateId) -> Option<K> {
        self.keys.get(&id).copied()
    }

    fn keys_of(&self, ids: &[StateId]) -> Vec<K> {
        ids.iter().filter_map(|id| self.key_of(*id)).collect()
    }
}

type TypedChangeListener<K> = Box<dyn FnMut(&StackOperationEvent<K>)>;
type TypedProgressListener<K> = Box<dyn FnMut(&StackProgressEvent<K>)>;

//=== TypedStateStack =====================================================

/// State stack addressed by keys instead of state handles.
///
/// # Example
///
/// ```rust
/// use state_stack_engine::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Flow { Menu, Game }
/// impl StateKey for Flow {}
///
/// struct Instant;
/// impl ApplicationState for Instant {
///     fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
///         reporter.complete();
///     }
/// }
///
/// let mut flow = TypedStateStack::new();
/// flow.register(Flow::Menu, Instant).unwrap();
/// flow.register(Flow::Game, Instant).unwrap();
///
/// flow.set(Flow::Menu).unwrap();
/// flow.push(Flow::Game).unwrap();
/// assert_eq!(flow.states().collect::<Vec<_>>(), vec![Flow::Menu, Flow::Game]);
/// ```
pub struct TypedStateStack<K: StateKey> {
    stack: StateStack,
    registry: Rc<RefCell<Registry<K>>>,
    change_listeners: Rc<RefCell<Vec<TypedChangeListener<K>>>>,
    progress_listeners: Rc<RefCell<Vec<TypedProgressListener<K>>>>,
}

impl<K: StateKey> TypedStateStack<K> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty typed stack with default settings.
    pub fn new() -> Self {
        Self::with_builder(StateStackBuilder::new())
    }

    /// Creates an empty typed stack from a configured builder.
    pub fn with_builder(builder: StateStackBuilder) -> Self {
        let mut stack = builder.build();
        let registry = Rc::new(RefCell::new(Registry::new()));
        let change_listeners: Rc<RefCell<Vec<TypedChangeListener<K>>>> = Rc::default();
        let progress_listeners: Rc<RefCell<Vec<TypedProgressListener<K>>>> = Rc::default();

        // Bridge untyped change events to key-based events
        let bridge_registry = Rc::clone(&registry);
        let bridge_listeners = Rc::clone(&change_listeners);
        stack.on_stack_changed(move |change| {
            let event = {
                let registry = bridge_registry.borrow();
                let Some(state) = registry.key_of(change.state) else {
                    return;
                };
                StackOperationEvent::new(
                    change.operation,
                    state,
                    registry.keys_of(&change.old_stack),
                    registry.keys_of(&change.new_stack),
                )
            };
            for listener in bridge_listeners.borrow_mut().iter_mut() {
                listener(&event);
            }
        });

        // Bridge untyped progress events
        let bridge_registry = Rc::clone(&registry);
        let bridge_listeners = Rc::clone(&progress_listeners);
        stack.on_progress(move |progress| {
            let Some(state) = bridge_registry.borrow().key_of(progress.state) else {
                return;
            };
            let event = StackProgressEvent {
                state,
                action: progress.action,
                progress: progress.progress,
            };
            for listener in bridge_listeners.borrow_mut().iter_mut() {
                listener(&event);
            }
        });

        Self {
            stack,
            registry,
            change_listeners,
            progress_listeners,
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers `state` under `key`.
    ///
    /// Fails if the key is taken or the same instance is already registered
    /// under another key.
    pub fn register_state(&mut self, key: K, state: StateRef) -> Result<(), TypedStackError<K>> {
        let mut registry = self.registry.borrow_mut();

        if registry.states.contains_key(&key) {
            return Err(TypedStackError::DuplicateKey(key));
        }

        let id = StateId::of(&state);
        if let Some(existing) = registry.key_of(id) {
            return Err(TypedStackError::DuplicateState {
                existing,
                requested: key,
            });
        }

        debug!("[{}] Registered {:?}", self.stack.name(), key);
        registry.keys.insert(id, key);
        registry.states.insert(key, state);
        Ok(())
    }

    /// Wraps `state` into a [`StateRef`] and registers it under `key`.
    ///
    /// Returns the handle so the caller can keep talking to the state.
    pub fn register<S>(&mut self, key: K, state: S) -> Result<StateRef, TypedStackError<K>>
    where
        S: ApplicationState + 'static,
    {
        let handle = state_ref(state);
        self.register_state(key, Rc::clone(&handle))?;
        Ok(handle)
    }

    /// Returns the state registered under `key`.
    pub fn state(&self, key: K) -> Option<StateRef> {
        self.registry.borrow().states.get(&key).cloned()
    }

    //--- Listeners --------------------------------------------------------

    /// Registers a listener fired after every completed push, pop or set.
    pub fn on_stack_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&StackOperationEvent<K>) + 'static,
    {
        self.change_listeners.borrow_mut().push(Box::new(listener));
    }

    /// Registers a listener fired for transition progress.
    pub fn on_progress<F>(&mut self, listener: F)
    where
        F: FnMut(&StackProgressEvent<K>) + 'static,
    {
        self.progress_listeners.borrow_mut().push(Box::new(listener));
    }

    /// Attaches a [`StackMonitor`] fed from this stack's events.
    ///
    /// The monitor may live on another thread. At most `capacity` entries
    /// wait between two polls; older entries are kept, newer ones dropped.
    pub fn monitor(&mut self, capacity: usize) -> StackMonitor<K> {
        let (monitor, changes, progress) = StackMonitor::attach(capacity, self.states().collect());
        self.on_stack_changed(changes);
        self.on_progress(progress);
        monitor
    }

    //--- Stack Operations -------------------------------------------------

    /// Pushes the state registered under `key`.
    pub fn push(&mut self, key: K) -> Result<(), TypedStackError<K>> {
        self.push_with(key, || {})
    }

    /// Pushes the state registered under `key`, then runs `on_complete`.
    pub fn push_with<F>(&mut self, key: K, on_complete: F) -> Result<(), TypedStackError<K>>
    where
        F: FnOnce() + 'static,
    {
        let state = self.lookup(key)?;
        if !self.stack.is_current(&state) && self.stack.contains(&state) {
            return Err(TypedStackError::AlreadyActive(key));
        }
        self.stack.push(state, on_complete)?;
        Ok(())
    }

    /// Pops the current state.
    pub fn pop(&mut self) -> Result<(), TypedStackError<K>> {
        self.pop_with(|_| {})
    }

    /// Pops the current state, then runs `on_complete` with its key.
    ///
    /// `on_complete(None)` runs immediately on an empty stack.
    pub fn pop_with<F>(&mut self, on_complete: F) -> Result<(), TypedStackError<K>>
    where
        F: FnOnce(Option<K>) + 'static,
    {
        let registry = Rc::clone(&self.registry);
        self.stack.pop(move |removed| {
            let key = removed.and_then(|state| registry.borrow().key_of(StateId::of(&state)));
            on_complete(key);
        })?;
        Ok(())
    }

    /// Replaces the whole stack with the state registered under `key`.
    pub fn set(&mut self, key: K) -> Result<(), TypedStackError<K>> {
        self.set_with(key, || {})
    }

    /// Replaces the whole stack, then runs `on_complete`.
    pub fn set_with<F>(&mut self, key: K, on_complete: F) -> Result<(), TypedStackError<K>>
    where
        F: FnOnce() + 'static,
    {
        let state = self.lookup(key)?;
        self.stack.set(state, on_complete)?;
        Ok(())
    }

    /// Ticks active states and advances the running operation.
    pub fn update(&mut self) {
        self.stack.update();
    }

    //--- Queries ----------------------------------------------------------

    /// Returns true if the current state is registered under `key`.
    ///
    /// Unregistered keys are never current.
    pub fn is_current(&self, key: K) -> bool {
        self.current() == Some(key)
    }

    /// Key of the current state.
    pub fn current(&self) -> Option<K> {
        let top = self.stack.current()?;
        self.registry.borrow().key_of(StateId::of(top))
    }

    /// Keys of the active states, bottom to top.
    ///
    /// The sequence is computed lazily from the live stack on each call.
    pub fn states(&self) -> StateKeys<'_, K> {
        StateKeys {
            registry: self.registry.borrow(),
            inner: self.stack.states().iter(),
        }
    }

    /// Number of active states.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if no state is active.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns true while an operation is waiting on a reporter.
    pub fn is_busy(&self) -> bool {
        self.stack.is_busy()
    }

    /// The underlying untyped stack.
    pub fn inner(&self) -> &StateStack {
        &self.stack
    }

    fn lookup(&self, key: K) -> Result<StateRef, TypedStackError<K>> {
        self.state(key).ok_or(TypedStackError::UnregisteredKey(key))
    }
}

impl<K: StateKey> Default for TypedStateStack<K> {
    fn default() -> Self {
        Self::new()
    }
}

//=== StateKeys ===========================================================

/// Lazy iterator over the keys of the active states, bottom to top.
pub struct StateKeys<'a, K: StateKey> {
    registry: Ref<'a, Registry<K>>,
    inner: slice::Iter<'a, StateRef>,
}

impl<K: StateKey> Iterator for StateKeys<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        for state in self.inner.by_ref() {
            if let Some(key) = self.registry.key_of(StateId::of(state)) {
                return Some(key);
            }
        }
        None
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
