//=========================================================================
// Scene Group State
//=========================================================================
//
// Application state that owns a group of additive scenes.
//
//   Added   → load every scene in order
//   Paused  → deactivate every scene
//   Resumed → nothing to do
//   Removed → unload every scene in reverse order
//
// The stack reporter follows the queue's aggregate progress and is
// completed from the queue's on_complete callback. The queue finishes its
// fade-out after that callback, so a transition arriving meanwhile keeps
// its reporter and starts from update() once the queue is idle.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::{SceneActionsQueue, SceneLoadService, ScenePreloader};
use crate::core::state::{ApplicationState, ProgressReporter, StackAction};

//=== SceneGroupState =====================================================

/// An [`ApplicationState`] whose transitions load and unload scenes.
pub struct SceneGroupState<S: SceneLoadService> {
    name: String,
    scenes: Vec<String>,
    queue: SceneActionsQueue<S>,
    deferred: Option<ProgressReporter>,
}

impl<S: SceneLoadService> SceneGroupState<S> {
    /// Creates a state for `scenes`, loaded in the given order.
    pub fn new<I>(name: impl Into<String>, scenes: I, service: S) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            scenes: scenes.into_iter().map(Into::into).collect(),
            queue: SceneActionsQueue::new(service),
            deferred: None,
        }
    }

    /// Shows `preloader` around every transition of this state.
    pub fn with_preloader<P>(mut self, preloader: P) -> Self
    where
        P: ScenePreloader + 'static,
    {
        self.queue = self.queue.with_preloader(preloader);
        self
    }

    /// Scene names in load order.
    pub fn scenes(&self) -> &[String] {
        &self.scenes
    }

    /// The queue running this state's scene actions.
    pub fn queue(&self) -> &SceneActionsQueue<S> {
        &self.queue
    }

    /// Mutable access to the queue, e.g. to reach the service.
    pub fn queue_mut(&mut self) -> &mut SceneActionsQueue<S> {
        &mut self.queue
    }

    /// Returns true while a transition waits for the previous run to end.
    pub fn is_waiting(&self) -> bool {
        self.deferred.is_some()
    }

    fn run(&mut self, reporter: ProgressReporter) {
        if self.queue.is_running() {
            debug!("Scene group `{}` waiting for its previous run to finish", self.name);
            self.deferred = Some(reporter);
            return;
        }

        let progress = reporter.clone();
        let done = reporter.clone();
        let result = self.queue.start(
            move |value| progress.update_progress(value),
            move || done.complete(),
        );

        if let Err(err) = result {
            warn!("Scene group `{}` could not start its transition: {}", self.name, err);
            self.deferred = Some(reporter);
        }
    }
}

impl<S: SceneLoadService> ApplicationState for SceneGroupState<S> {
    fn change_state(&mut self, action: StackAction, reporter: ProgressReporter) {
        debug!("Scene group `{}` handling {:?}", self.name, action);

        match action {
            StackAction::Added => {
                for scene in &self.scenes {
                    self.queue.load(scene.as_str());
                }
            }
            StackAction::Paused => {
                for scene in &self.scenes {
                    self.queue.deactivate(scene.as_str());
                }
            }
            StackAction::Resumed => {
                reporter.complete();
                return;
            }
            StackAction::Removed => {
                for scene in self.scenes.iter().rev() {
                    self.queue.unload(scene.as_str());
                }
            }
        }

        self.run(reporter);
    }

    fn update(&mut self) {
        self.queue.update();

        if !self.queue.is_running() {
            if let Some(reporter) = self.deferred.take() {
                self.run(reporter);
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
