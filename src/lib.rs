//=========================================================================
// State Stack Engine — Library Root
//
// Application state management for games and interactive tools.
//
// Responsibilities:
// - Keep a stack of application states with serial, asynchronous
//   transitions (`StateStack`, `TypedStateStack`)
// - Notify listeners about completed operations and transition progress
// - Run additive scene load/deactivate/unload actions in FIFO order
//   (`SceneActionsQueue`, `SceneGroupState`)
//
// Typical usage:
// ```
// use state_stack_engine::prelude::*;
//
// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
// enum Screen {
//     Menu,
// }
//
// impl StateKey for Screen {}
//
// struct Menu;
//
// impl ApplicationState for Menu {
//     fn change_state(&mut self, _action: StackAction, reporter: ProgressReporter) {
//         reporter.complete();
//     }
// }
//
// let mut stack = TypedStateStack::new();
// stack.register(Screen::Menu, Menu).unwrap();
// stack.set(Screen::Menu).unwrap();
// assert!(stack.is_current(Screen::Menu));
// ```
//
// The host drives deferred transitions by calling `update()` once per
// frame on each stack.
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the state stack, scene queue and debug monitor.
// `prelude` re-exports the types most applications need.
//
pub mod core;
pub mod prelude;
