// src/paths/mod.rs

//! String-level path handling.
//!
//! - [`template`] expands `<sample_id>`-style placeholders and joins
//!   locations.
//! - [`patterns`] implements the `^`-marker file-name pattern vocabulary.

pub mod patterns;
pub mod template;

pub use patterns::{FilePattern, InputPattern, matches_any};
pub use template::{Placeholders, ensure_trailing_slash, file_name, join};
