//! Display-name sanitization
//!
//! Participants may pick any name they like, but everything that reaches
//! the roster goes through [`clean`] first: whitespace is trimmed,
//! over-long and inappropriate names are replaced, and an empty request
//! falls back to the shared placeholder.

use rustrict::CensorStr;

use crate::constants::names::{MAX_NAME_LENGTH, PLACEHOLDER};

/// Sanitizes a requested display name.
///
/// Returns the trimmed name, or [`PLACEHOLDER`] when the request is
/// empty, longer than [`MAX_NAME_LENGTH`], or inappropriate. Unlike a
/// validation error, a rejected name is not surfaced to the sender; the
/// placeholder simply shows up in the next roster broadcast.
pub fn clean(requested: &str) -> String {
    if requested.len() > MAX_NAME_LENGTH {
        return PLACEHOLDER.to_owned();
    }
    let name = rustrict::trim_whitespace(requested);
    if name.is_empty() || name.is_inappropriate() {
        return PLACEHOLDER.to_owned();
    }
    name.to_owned()
}
