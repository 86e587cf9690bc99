//! Shared infrastructure utilities for delve.
//!
//! Cross-cutting helpers that don't belong in the domain-pure `delve-types` crate:
//!
//! - **`atomic_write`**: Crash-safe result files (temp + rename)
//! - **`file_name`**: Mapping probed names to safe file names
//! - **`display`**: Stripping terminal control sequences from remote text

pub mod atomic_write;
pub mod display;
pub mod file_name;

pub use atomic_write::{FileSyncPolicy, atomic_write};
pub use display::sanitize_display_text;
pub use file_name::safe_file_name;
