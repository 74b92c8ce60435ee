//=========================================================================
// Scene Actions Queue
//=========================================================================
//
// FIFO queue of scene load/deactivate/unload actions.
//
// Actions are queued before start() and executed strictly one at a time:
// the next action is dispatched only after the service signals the
// previous one. update() is the per-frame pump that drains completions
// and samples the in-flight load's progress.
//
//   Idle ──start()──> FadingIn ──> Running ──queue empty──> FadingOut ──> Idle
//                     (skipped without a preloader)        (skipped likewise)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, VecDeque};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use super::completion::SceneSignal;
use super::{
    DeactivateCompletion, LoadCompletion, LoadProgress, SceneAction, SceneActionKind,
    SceneLoadService, ScenePreloader, UnloadCompletion,
};
use crate::core::state::ProgressReporter;

//=== QueueError ==========================================================

/// Errors raised by [`SceneActionsQueue::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `start` was called before the previous run (fade-out included) ended.
    #[error("scene action queue is already running")]
    AlreadyRunning,
}

//=== Internal State ======================================================

enum Phase {
    Idle,
    FadingIn(ProgressReporter),
    Running,
    FadingOut(ProgressReporter),
}

struct InFlightAction {
    ticket: u64,
    action: SceneAction,
    progress: Option<Box<dyn LoadProgress>>,
}

type ProgressCallback = Box<dyn FnMut(f32)>;
type CompleteCallback = Box<dyn FnOnce()>;

//=== SceneActionsQueue ===================================================

/// Executes queued scene actions in order against a [`SceneLoadService`].
///
/// Loaded scenes and their managers are recorded by scene name and stay
/// available until the next [`SceneActionsQueue::start`].
///
/// # Example
///
/// ```rust
/// use state_stack_engine::core::scene::*;
/// use state_stack_engine::prelude::*;
///
/// struct InstantLoader;
///
/// impl SceneLoadService for InstantLoader {
///     type Scene = String;
///     type Manager = ();
///
///     fn load(&mut self, name: &str, done: LoadCompletion<String, ()>) -> Box<dyn LoadProgress> {
///         done.loaded(name.to_string(), None);
///         Box::new(ProgressReporter::new())
///     }
///
///     fn deactivate(&mut self, _name: &str, done: DeactivateCompletion<String, ()>) {
///         done.deactivated(None);
///     }
///
///     fn unload(&mut self, _name: &str, done: UnloadCompletion<String, ()>) {
///         done.unloaded();
///     }
/// }
///
/// let mut queue = SceneActionsQueue::new(InstantLoader);
/// queue.load("Lobby");
/// queue.start(|_progress| {}, || {}).unwrap();
///
/// assert!(!queue.is_running());
/// assert_eq!(queue.loaded_scene("Lobby").map(String::as_str), Some("Lobby"));
/// ```
pub struct SceneActionsQueue<S: SceneLoadService> {
    service: S,
    preloader: Option<Box<dyn ScenePreloader>>,
    queue: VecDeque<SceneAction>,
    phase: Phase,
    in_flight: Option<InFlightAction>,
    completed: usize,
    total: usize,
    next_ticket: u64,
    loaded_scenes: HashMap<String, S::Scene>,
    scene_managers: HashMap<String, S::Manager>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback>,
    signal_tx: Sender<SceneSignal<S::Scene, S::Manager>>,
    signal_rx: Receiver<SceneSignal<S::Scene, S::Manager>>,
}

impl<S: SceneLoadService> SceneActionsQueue<S> {
    //--- Construction -----------------------------------------------------

    /// Creates an idle queue driving `service`.
    pub fn new(service: S) -> Self {
        let (signal_tx, signal_rx) = unbounded();

        Self {
            service,
            preloader: None,
            queue: VecDeque::new(),
            phase: Phase::Idle,
            in_flight: None,
            completed: 0,
            total: 0,
            next_ticket: 1,
            loaded_scenes: HashMap::new(),
            scene_managers: HashMap::new(),
            on_progress: None,
            on_complete: None,
            signal_tx,
            signal_rx,
        }
    }

    /// Wraps every run in the preloader's fade-in and fade-out.
    pub fn with_preloader<P>(mut self, preloader: P) -> Self
    where
        P: ScenePreloader + 'static,
    {
        self.preloader = Some(Box::new(preloader));
        self
    }

    //--- Queueing ---------------------------------------------------------

    /// Appends an action to the queue.
    pub fn push(&mut self, action: SceneAction) {
        if matches!(self.phase, Phase::Running | Phase::FadingIn(_)) {
            self.total += 1;
        }
        self.queue.push_back(action);
    }

    /// Queues a `Load` of `scene_name`.
    pub fn load(&mut self, scene_name: impl Into<String>) {
        self.push(SceneAction::load(scene_name));
    }

    /// Queues a `Deactivate` of `scene_name`.
    pub fn deactivate(&mut self, scene_name: impl Into<String>) {
        self.push(SceneAction::deactivate(scene_name));
    }

    /// Queues an `Unload` of `scene_name`.
    pub fn unload(&mut self, scene_name: impl Into<String>) {
        self.push(SceneAction::unload(scene_name));
    }

    /// Returns an iterator over the actions not yet dispatched.
    pub fn iter(&self) -> impl Iterator<Item = &SceneAction> {
        self.queue.iter()
    }

    /// Number of actions not yet dispatched.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no action is waiting for dispatch.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every action not yet dispatched.
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    //--- Execution --------------------------------------------------------

    /// Runs the queued actions.
    ///
    /// Clears the results of the previous run, fades in if a preloader is
    /// set, then dispatches actions in order. `on_progress` receives the
    /// aggregate progress every [`SceneActionsQueue::update`] and a final
    /// `1.0`; `on_complete` runs once the queue is empty, before fade-out.
    pub fn start<P, C>(&mut self, on_progress: P, on_complete: C) -> Result<(), QueueError>
    where
        P: FnMut(f32) + 'static,
        C: FnOnce() + 'static,
    {
        if !matches!(self.phase, Phase::Idle) {
            warn!("Scene queue start rejected, previous run still active");
            return Err(QueueError::AlreadyRunning);
        }

        self.loaded_scenes.clear();
        self.scene_managers.clear();
        self.completed = 0;
        self.total = self.queue.len();
        self.on_progress = Some(Box::new(on_progress));
        self.on_complete = Some(Box::new(on_complete));

        info!("Starting scene queue with {} action(s)", self.total);

        match self.preloader.as_mut() {
            Some(preloader) => {
                let fade = ProgressReporter::new();
                preloader.fade_in(fade.clone());
                self.phase = Phase::FadingIn(fade);
            }
            None => self.phase = Phase::Running,
        }

        self.advance();
        Ok(())
    }

    /// Per-frame tick: drains completions, dispatches, reports progress.
    pub fn update(&mut self) {
        self.advance();

        if matches!(self.phase, Phase::Running) {
            let progress = self.aggregate_progress();
            self.emit_progress(progress);
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Returns true from `start` until the run (fade-out included) ends.
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// The action currently waiting on the service.
    pub fn current_action(&self) -> Option<&SceneAction> {
        self.in_flight.as_ref().map(|in_flight| &in_flight.action)
    }

    /// Scene loaded during the current or last run.
    pub fn loaded_scene(&self, scene_name: &str) -> Option<&S::Scene> {
        self.loaded_scenes.get(scene_name)
    }

    /// Manager recorded for `scene_name` during the current or last run.
    pub fn scene_manager(&self, scene_name: &str) -> Option<&S::Manager> {
        self.scene_managers.get(scene_name)
    }

    /// All scenes recorded during the current or last run.
    pub fn loaded_scenes(&self) -> impl Iterator<Item = (&str, &S::Scene)> {
        self.loaded_scenes.iter().map(|(name, scene)| (name.as_str(), scene))
    }

    /// The wrapped scene service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Mutable access to the wrapped scene service.
    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    //--- Internal Helpers -------------------------------------------------

    fn advance(&mut self) {
        loop {
            match &self.phase {
                Phase::Idle => return,
                Phase::FadingIn(fade) => {
                    if !fade.is_done() {
                        return;
                    }
                    debug!("Scene queue fade-in finished");
                    self.phase = Phase::Running;
                }
                Phase::Running => {
                    if !self.step() {
                        return;
                    }
                }
                Phase::FadingOut(fade) => {
                    if fade.is_done() {
                        info!("Scene queue finished");
                        self.phase = Phase::Idle;
                    }
                    return;
                }
            }
        }
    }

    /// Returns false while the in-flight action is still pending.
    fn step(&mut self) -> bool {
        self.drain_signals();

        if self.in_flight.is_some() {
            return false;
        }

        match self.queue.pop_front() {
            Some(action) => self.dispatch(action),
            None => self.finish_run(),
        }
        true
    }

    fn dispatch(&mut self, action: SceneAction) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        debug!("Scene queue dispatching {:?} `{}`", action.kind, action.scene_name);

        let name = action.scene_name.as_str();
        let tx = self.signal_tx.clone();
        let progress = match action.kind {
            SceneActionKind::Load => Some(self.service.load(name, LoadCompletion::new(ticket, name, tx))),
            SceneActionKind::Deactivate => {
                self.service.deactivate(name, DeactivateCompletion::new(ticket, name, tx));
                None
            }
            SceneActionKind::Unload => {
                self.service.unload(name, UnloadCompletion::new(ticket, name, tx));
                None
            }
        };

        self.in_flight = Some(InFlightAction {
            ticket,
            action,
            progress,
        });
    }

    fn drain_signals(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            let action = match self.in_flight.take() {
                Some(in_flight) if in_flight.ticket == signal.ticket() => in_flight.action,
                other => {
                    warn!("Ignoring scene completion for unknown ticket {}", signal.ticket());
                    self.in_flight = other;
                    continue;
                }
            };

            let name = action.scene_name;
            match signal {
                SceneSignal::Loaded { scene, manager, .. } => {
                    if let Some(manager) = manager {
                        self.scene_managers.insert(name.clone(), manager);
                    }
                    debug!("Scene `{}` loaded", name);
                    self.loaded_scenes.insert(name, scene);
                }
                SceneSignal::Deactivated { manager, .. } => {
                    debug!("Scene `{}` deactivated", name);
                    match manager {
                        Some(manager) => {
                            self.scene_managers.insert(name, manager);
                        }
                        None => {
                            self.scene_managers.remove(&name);
                        }
                    }
                }
                SceneSignal::Unloaded { .. } => {
                    debug!("Scene `{}` unloaded", name);
                    self.scene_managers.remove(&name);
                    self.loaded_scenes.remove(&name);
                }
            }

            self.completed += 1;
        }
    }

    fn finish_run(&mut self) {
        self.emit_progress(1.0);

        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
        self.on_progress = None;

        match self.preloader.as_mut() {
            Some(preloader) => {
                let fade = ProgressReporter::new();
                preloader.fade_out(fade.clone());
                self.phase = Phase::FadingOut(fade);
            }
            None => {
                info!("Scene queue finished");
                self.phase = Phase::Idle;
            }
        }
    }

    fn aggregate_progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }

        let current = self
            .in_flight
            .as_ref()
            .and_then(|in_flight| in_flight.progress.as_ref())
            .map_or(0.0, |source| source.progress().clamp(0.0, 1.0));

        ((self.completed as f32 + current) / self.total as f32).clamp(0.0, 1.0)
    }

    fn emit_progress(&mut self, progress: f32) {
        if let Some(preloader) = self.preloader.as_mut() {
            preloader.on_progress(progress);
        }
        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(progress);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
