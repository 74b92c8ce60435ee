//=========================================================================
// Core Systems
//
// Subsystems making up the state stack engine.
//
// Modules:
// - `state`: application states, stacks, progress reporting, events
// - `scene`: FIFO scene action queue and scene-backed states
// - `debug`: headless stack monitor fed by stack events
//
// Notes:
// Everything here is single-threaded and driven by the host's frame
// loop through `update()`. Only progress reporters and scene completion
// handles cross into other threads, through crossbeam channels.
//
//=========================================================================

pub mod debug;
pub mod scene;
pub mod state;
