// Start of file: /src/config/mod.rs

/*
* Re-export submodules related to configuration and the environment snapshot.
*/

pub mod environment;

pub use environment::{BootstrapConfig, EnvSnapshot, HandoffMode, LaunchMode, DOWNSTREAM_KEYS};

// End of file: /src/config/mod.rs
