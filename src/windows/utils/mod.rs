//! Windows utility functions

pub mod string_conv;

pub use string_conv::{extract_filename, wide_to_string};
