//! Common types and traits shared across the VFP crates.
//!
//! This crate holds the driver description and the probing/open-mode
//! abstractions used by `vfp-core`, keeping them free of any parsing code.

pub mod drivers;
pub mod io;

// Re-export commonly used types
pub use drivers::{Driver, DriverCapabilities, SupportStatus};
pub use io::{FormatProbe, OpenMode};
