// Start of file: /src/core/mod.rs

/*
    * The bootstrap sequence and the pieces it is built from.
*/

pub mod bootstrap;
pub mod handoff;
pub mod launch;
pub mod logging;
pub mod runner;
pub mod state;

// End of file: /src/core/mod.rs
