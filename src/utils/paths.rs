use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::WardenError;

const FALLBACK_NAME: &str = "unknown";
const MAX_COMPONENT_BYTES: usize = 255;

static DOT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").unwrap());

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "CONIN$", "CONOUT$",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_disallowed(c: char) -> bool {
    matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*')
        || c.is_control()
        || matches!(
            c,
            // zero-width chars, LRM/RLM, bidi embeddings/overrides/isolates, BOM
            '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2069}'
                | '\u{FEFF}'
                // slash and backslash look-alikes
                | '\u{2044}' | '\u{2215}' | '\u{29F8}' | '\u{FF0F}'
                | '\u{29F9}' | '\u{FE68}' | '\u{FF3C}'
                // dot look-alikes
                | '\u{2024}' | '\u{2025}' | '\u{2026}' | '\u{FF0E}'
        )
}

fn is_reserved_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

fn truncate_to_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

fn trim_trailing(s: &str) -> &str {
    s.trim_end_matches(|c| c == '.' || c == ' ')
}

/// Turn an arbitrary target identifier (repo path, image ref, URL host,
/// k8s context) into a single directory name.
///
/// The result never contains `/`, `\` or `..`, never starts with a dot and
/// is never empty (`"unknown"` is returned when nothing usable is left).
pub fn sanitize_path_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_disallowed(c) { '_' } else { c })
        .collect();

    let collapsed = DOT_RUN.replace_all(&replaced, "_");
    let trimmed = trim_trailing(collapsed.trim_start_matches('.'));

    let mut safe = if is_reserved_device_name(trimmed) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    };

    truncate_to_boundary(&mut safe, MAX_COMPONENT_BYTES);
    let safe = trim_trailing(&safe);

    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe.to_string()
    }
}

/// Resolve `candidate` and make sure it stays inside `base_dir`.
///
/// `base_dir` must exist. A relative candidate is taken relative to
/// `base_dir`. Parts of the candidate that do not exist yet are resolved
/// lexically on top of the deepest existing (canonicalized) ancestor, so the
/// check can run before directories are created. Symlinks are followed; a
/// link that leads outside the base, or a dangling link, is rejected.
pub fn validate_output_path(base_dir: &Path, candidate: &Path) -> Result<PathBuf, WardenError> {
    let base = base_dir.canonicalize().map_err(|e| {
        WardenError::Config(format!(
            "Results directory {} is not accessible: {}",
            base_dir.display(),
            e
        ))
    })?;

    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    let resolved = resolve_lenient(&joined, &base)?;
    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(WardenError::PathTraversal { path: resolved, base })
    }
}

fn resolve_lenient(path: &Path, base: &Path) -> Result<PathBuf, WardenError> {
    let traversal = |p: &Path| WardenError::PathTraversal {
        path: p.to_path_buf(),
        base: base.to_path_buf(),
    };

    let (anchor, mut resolved) = path
        .ancestors()
        .find_map(|ancestor| ancestor.canonicalize().ok().map(|c| (ancestor, c)))
        .ok_or_else(|| traversal(path))?;

    let remainder = path.strip_prefix(anchor).map_err(|_| traversal(path))?;
    for component in remainder.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                // Anything that exists here could not be canonicalized with the
                // full path (dangling link, unreadable entry); resolve it or refuse.
                if resolved.symlink_metadata().is_ok() {
                    resolved = resolved.canonicalize().map_err(|_| traversal(path))?;
                }
            }
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return Err(traversal(path)),
        }
    }

    Ok(resolved)
}
