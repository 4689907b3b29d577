//! DOT format utilities for graph visualization.
//!
//! This module provides utilities for generating DOT format output,
//! which can be rendered using Graphviz tools.

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// This function handles all characters that have special meaning in DOT format,
/// including quotes, backslashes, newlines, and angle brackets.
///
/// # Arguments
///
/// * `s` - The string to escape
///
/// # Returns
///
/// A new string with all special characters properly escaped.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}
