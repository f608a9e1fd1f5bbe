//! Working-directory resolution.

use std::path::{Component, Path, PathBuf};

/// Resolve a user supplied path against the current working directory.
///
/// A leading `~` is expanded, relative paths are joined onto `base`, and
/// `.`/`..` components are folded lexically (the result is not required
/// to exist).
pub fn resolve_path(base: &Path, input: &str) -> PathBuf {
    let expanded = shellexpand::tilde(input.trim());
    let candidate = Path::new(expanded.as_ref());
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };
    normalize(&joined)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never climb above the root
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
