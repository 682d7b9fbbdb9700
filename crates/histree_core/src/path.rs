//! Path normalization and splitting.
//!
//! Paths are `/`-separated segment lists. `/` alone addresses the root.
//! A segment beginning with `$` or `@` is a *reference*: a property access
//! on the node reached by the preceding segments rather than a child of it.

use crate::error::{CoreError, CoreResult};

/// The path separator.
pub const SEPARATOR: char = '/';

/// Normalizes a raw path string.
///
/// Rejects empty paths and paths containing a doubled separator. The
/// literal root path `/` is returned unchanged. Otherwise a single leading
/// separator is stripped or enforced according to `leading`, and one
/// trailing separator is stripped if present.
///
/// Normalization is idempotent for a fixed `leading` flag.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPath`] if the path is empty or contains `//`.
pub fn normalize(path: &str, leading: bool) -> CoreResult<String> {
    if path.is_empty() {
        return Err(CoreError::invalid_path("path is empty"));
    }
    if path.contains("//") {
        return Err(CoreError::invalid_path("path contains //"));
    }
    if path == "/" {
        return Ok(path.to_string());
    }

    let trimmed = path.strip_prefix(SEPARATOR).unwrap_or(path);
    let mut out = if leading {
        let mut s = String::with_capacity(trimmed.len() + 1);
        s.push(SEPARATOR);
        s.push_str(trimmed);
        s
    } else {
        trimmed.to_string()
    };
    if out.ends_with(SEPARATOR) {
        out.pop();
    }
    Ok(out)
}

/// Splits a path into its ordered segments.
///
/// The path is normalized with no leading separator first. The root path
/// yields no segments; every other valid path yields at least one.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPath`] if normalization fails.
pub fn split(path: &str) -> CoreResult<Vec<String>> {
    let normalized = normalize(path, false)?;
    if normalized == "/" {
        return Ok(Vec::new());
    }
    Ok(normalized.split(SEPARATOR).map(str::to_string).collect())
}

/// Whether a segment is a reference to a configuration or attribute.
pub fn is_reference(name: &str) -> bool {
    name.starts_with('$') || name.starts_with('@')
}

/// Whether a string is acceptable as a node name.
///
/// Names must be non-empty, contain no separator, and not begin with a
/// reserved reference prefix.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR) && !is_reference(name)
}
