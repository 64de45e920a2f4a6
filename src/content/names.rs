//! Stored-name rules for the content root.
//!
//! Every file under the content root has a flat name made of ASCII
//! alphanumerics, `.`, `-` and `_`, never starting or ending with a dot or
//! underscore. Upload hints are reduced to that form; hints that try to climb
//! out of the root are rejected outright rather than rewritten.

use super::ContentError;

/// Longest sanitized name produced from a hint (leaves room for a suffix).
const MAX_HINT_LEN: usize = 200;
/// Longest name accepted as a stored name.
const MAX_STORED_LEN: usize = 255;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn trim_edges(name: &str) -> &str {
    name.trim_matches(|c| c == '.' || c == '_')
}

/// Reduce an upload filename hint to a safe stored name.
///
/// Parent-directory segments, absolute paths and NUL bytes fail with
/// [`ContentError::InvalidName`]. Remaining separators are flattened to `_`.
pub fn sanitize(hint: &str) -> Result<String, ContentError> {
    let invalid = || ContentError::InvalidName(hint.to_string());

    if hint.contains('\0') || hint.starts_with(['/', '\\']) {
        return Err(invalid());
    }

    let segments: Vec<&str> = hint
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.iter().any(|s| *s == "..") {
        return Err(invalid());
    }

    let flattened: String = segments
        .join("_")
        .chars()
        .filter_map(|c| match c {
            c if is_allowed(c) => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let name = truncate(trim_edges(&flattened));
    if name.is_empty() {
        return Err(invalid());
    }
    Ok(name)
}

/// Check that a name read back from a record is a plain stored name.
pub fn validate_stored(name: &str) -> Result<(), ContentError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_STORED_LEN
        && name.chars().all(is_allowed)
        && trim_edges(name) == name;

    if valid {
        Ok(())
    } else {
        Err(ContentError::InvalidName(name.to_string()))
    }
}

/// Insert a disambiguating suffix before the extension: `notes.pdf` -> `notes-1a2b3c4d.pdf`.
pub fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], suffix, &name[dot..]),
        _ => format!("{name}-{suffix}"),
    }
}

fn truncate(name: &str) -> String {
    if name.len() <= MAX_HINT_LEN {
        return name.to_string();
    }
    // All characters are ASCII at this point, so byte slicing is safe.
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= 16 => {
            let ext = &name[dot..];
            let stem = trim_edges(&name[..MAX_HINT_LEN - ext.len()]);
            format!("{stem}{ext}")
        }
        _ => trim_edges(&name[..MAX_HINT_LEN]).to_string(),
    }
}
