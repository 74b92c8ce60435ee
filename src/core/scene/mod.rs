//=========================================================================
// Scene System
//=========================================================================
//
// FIFO execution of additive scene actions against an external loader.
//
// Architecture:
//   SceneActionsQueue<S: SceneLoadService>
//     ├─ queue: VecDeque<SceneAction>
//     ├─ service: S                 (load / deactivate / unload)
//     ├─ preloader: ScenePreloader  (optional fade + progress display)
//     └─ loaded scenes + scene managers by name
//
// Flow:
//   start() → fade_in → [dispatch → completion]* → progress 1.0
//           → on_complete → fade_out
//
//=========================================================================

//=== Module Declarations =================================================

mod action_queue;
mod completion;
mod scene_state;

//=== Public API ==========================================================

pub use action_queue::{QueueError, SceneActionsQueue};
pub use completion::{DeactivateCompletion, LoadCompletion, UnloadCompletion};
pub use scene_state::SceneGroupState;

use crate::core::state::ProgressReporter;

//=== Scene Actions =======================================================

/// Kind of work a queued scene action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneActionKind {
    /// Load the scene additively.
    Load,

    /// Run the scene's deactivation hook.
    Deactivate,

    /// Unload the scene.
    Unload,
}

/// A single queued scene operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneAction {
    /// What to do with the scene.
    pub kind: SceneActionKind,

    /// Name the scene service knows the scene by.
    pub scene_name: String,
}

impl SceneAction {
    /// Creates a `Load` action.
    pub fn load(scene_name: impl Into<String>) -> Self {
        Self::new(SceneActionKind::Load, scene_name)
    }

    /// Creates a `Deactivate` action.
    pub fn deactivate(scene_name: impl Into<String>) -> Self {
        Self::new(SceneActionKind::Deactivate, scene_name)
    }

    /// Creates an `Unload` action.
    pub fn unload(scene_name: impl Into<String>) -> Self {
        Self::new(SceneActionKind::Unload, scene_name)
    }

    /// Creates an action of any kind.
    pub fn new(kind: SceneActionKind, scene_name: impl Into<String>) -> Self {
        Self {
            kind,
            scene_name: scene_name.into(),
        }
    }
}

//=== Collaborator Traits =================================================

/// Progress of an in-flight load, sampled once per queue tick.
pub trait LoadProgress {
    /// Current progress in `[0, 1]`.
    fn progress(&self) -> f32;
}

impl LoadProgress for ProgressReporter {
    fn progress(&self) -> f32 {
        ProgressReporter::progress(self)
    }
}

/// Host-side scene loader.
///
/// Every call receives a one-shot completion handle that must eventually
/// be signaled exactly once. Completing inside the call is allowed.
/// Failures are the service's business; the queue stalls if a handle is
/// never signaled.
pub trait SceneLoadService {
    /// Handle to a loaded scene.
    type Scene;

    /// Per-scene manager object located inside a loaded scene.
    type Manager;

    /// Loads `scene_name` additively; returns the progress source to poll.
    fn load(
        &mut self,
        scene_name: &str,
        done: LoadCompletion<Self::Scene, Self::Manager>,
    ) -> Box<dyn LoadProgress>;

    /// Runs the deactivation hook of `scene_name`.
    fn deactivate(&mut self, scene_name: &str, done: DeactivateCompletion<Self::Scene, Self::Manager>);

    /// Unloads `scene_name`.
    fn unload(&mut self, scene_name: &str, done: UnloadCompletion<Self::Scene, Self::Manager>);
}

/// Optional loading screen wrapped around a queue run.
///
/// Fades signal completion by completing the given reporter.
pub trait ScenePreloader {
    /// Shows the loading screen.
    fn fade_in(&mut self, done: ProgressReporter);

    /// Hides the loading screen.
    fn fade_out(&mut self, done: ProgressReporter);

    /// Aggregate queue progress in `[0, 1]`.
    fn on_progress(&mut self, progress: f32);
}

//=== Tests ===============================================================
