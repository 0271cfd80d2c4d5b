// Start of file: /src/utils/mod.rs

/*
    * Re-exports for error handling and the boot report.
*/

pub mod error_handling;
pub mod report;

// End of file: /src/utils/mod.rs
