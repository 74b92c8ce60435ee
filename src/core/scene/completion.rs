//=========================================================================
// Scene Completions
//=========================================================================
//
// One-shot handles given to the SceneLoadService for each dispatched
// action. Signaling consumes the handle, so an action can complete at
// most once. Dropping a handle unsignaled stalls the queue and is logged.
//
//   service ── loaded()/deactivated()/unloaded() ──> Sender<SceneSignal>
//                                                     ↓
//   SceneActionsQueue::update() ── drain ──> record results, next action
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::Sender;
use log::{debug, warn};

//=== SceneSignal =========================================================

/// Completion message from the service back to the queue.
pub(crate) enum SceneSignal<Sc, M> {
    Loaded {
        ticket: u64,
        scene: Sc,
        manager: Option<M>,
    },
    Deactivated {
        ticket: u64,
        manager: Option<M>,
    },
    Unloaded {
        ticket: u64,
    },
}

impl<Sc, M> SceneSignal<Sc, M> {
    pub(crate) fn ticket(&self) -> u64 {
        match self {
            Self::Loaded { ticket, .. }
            | Self::Deactivated { ticket, .. }
            | Self::Unloaded { ticket } => *ticket,
        }
    }
}

//=== Shared Handle =======================================================

struct Signal<Sc, M> {
    ticket: u64,
    scene_name: String,
    operation: &'static str,
    sender: Option<Sender<SceneSignal<Sc, M>>>,
}

impl<Sc, M> Signal<Sc, M> {
    fn new(ticket: u64, scene_name: &str, operation: &'static str, sender: Sender<SceneSignal<Sc, M>>) -> Self {
        Self {
            ticket,
            scene_name: scene_name.to_string(),
            operation,
            sender: Some(sender),
        }
    }

    fn send(&mut self, signal: SceneSignal<Sc, M>) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if sender.send(signal).is_err() {
            debug!(
                "{} of `{}` finished after its queue was dropped",
                self.operation, self.scene_name
            );
        }
    }
}

impl<Sc, M> Drop for Signal<Sc, M> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!(
                "{} completion for `{}` dropped without signaling, scene queue will stall",
                self.operation, self.scene_name
            );
        }
    }
}

//=== LoadCompletion ======================================================

/// Completion of a `Load` action.
pub struct LoadCompletion<Sc, M>(Signal<Sc, M>);

impl<Sc, M> LoadCompletion<Sc, M> {
    pub(crate) fn new(ticket: u64, scene_name: &str, sender: Sender<SceneSignal<Sc, M>>) -> Self {
        Self(Signal::new(ticket, scene_name, "Load", sender))
    }

    /// Name of the scene being loaded.
    pub fn scene_name(&self) -> &str {
        &self.0.scene_name
    }

    /// Reports the loaded scene and the manager found inside it, if any.
    pub fn loaded(mut self, scene: Sc, manager: Option<M>) {
        let ticket = self.0.ticket;
        self.0.send(SceneSignal::Loaded {
            ticket,
            scene,
            manager,
        });
    }
}

//=== DeactivateCompletion ================================================

/// Completion of a `Deactivate` action.
pub struct DeactivateCompletion<Sc, M>(Signal<Sc, M>);

impl<Sc, M> DeactivateCompletion<Sc, M> {
    pub(crate) fn new(ticket: u64, scene_name: &str, sender: Sender<SceneSignal<Sc, M>>) -> Self {
        Self(Signal::new(ticket, scene_name, "Deactivate", sender))
    }

    /// Name of the scene being deactivated.
    pub fn scene_name(&self) -> &str {
        &self.0.scene_name
    }

    /// Reports the scene's manager after deactivation (`None` clears it).
    pub fn deactivated(mut self, manager: Option<M>) {
        let ticket = self.0.ticket;
        self.0.send(SceneSignal::Deactivated { ticket, manager });
    }
}

//=== UnloadCompletion ====================================================

/// Completion of an `Unload` action.
pub struct UnloadCompletion<Sc, M>(Signal<Sc, M>);

impl<Sc, M> UnloadCompletion<Sc, M> {
    pub(crate) fn new(ticket: u64, scene_name: &str, sender: Sender<SceneSignal<Sc, M>>) -> Self {
        Self(Signal::new(ticket, scene_name, "Unload", sender))
    }

    /// Name of the scene being unloaded.
    pub fn scene_name(&self) -> &str {
        &self.0.scene_name
    }

    /// Reports that the scene is gone.
    pub fn unloaded(mut self) {
        let ticket = self.0.ticket;
        self.0.send(SceneSignal::Unloaded { ticket });
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn load_completion_sends_payload_once() {
        let (tx, rx) = unbounded::<SceneSignal<&str, u32>>();
        let done = LoadCompletion::new(3, "Lobby", tx);
        assert_eq!(done.scene_name(), "Lobby");

        done.loaded("lobby-scene", Some(9));

        let signals: Vec<_> = rx.try_iter().collect();
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            SceneSignal::Loaded {
                ticket,
                scene,
                manager,
            } => {
                assert_eq!(*ticket, 3);
                assert_eq!(*scene, "lobby-scene");
                assert_eq!(*manager, Some(9));
            }
            _ => panic!("expected a load signal"),
        }
    }

    #[test]
    fn tickets_are_carried_by_every_kind() {
        let (tx, rx) = unbounded::<SceneSignal<(), ()>>();

        DeactivateCompletion::new(4, "A", tx.clone()).deactivated(None);
        UnloadCompletion::new(5, "A", tx).unloaded();

        let tickets: Vec<_> = rx.try_iter().map(|signal| signal.ticket()).collect();
        assert_eq!(tickets, vec![4, 5]);
    }

    #[test]
    fn dropped_handle_sends_nothing() {
        let (tx, rx) = unbounded::<SceneSignal<(), ()>>();
        drop(UnloadCompletion::new(1, "A", tx));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn signaling_after_queue_is_gone_is_harmless() {
        let (tx, rx) = unbounded::<SceneSignal<(), ()>>();
        drop(rx);

        UnloadCompletion::new(1, "A", tx).unloaded();
    }
}
