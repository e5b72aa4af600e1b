//! Serving the static UI files.

use std::{fs, io};
use std::path::{Component, Path, PathBuf};
use log::warn;
use super::response::{ActionResult, ContentType};


//------------ resolve -------------------------------------------------------

/// Resolves a request path to a file under the asset root.
///
/// The root path `/` is mapped to `index.html`. Returns `None` if there is
/// no such file so the router can answer with a 404. The content type is
/// derived from the file’s extension only.
pub fn resolve(root: &Path, path: &str) -> Option<ActionResult> {
    let candidate = candidate_path(root, path)?;
    if !candidate.is_file() {
        return None
    }
    match fs::read(&candidate) {
        Ok(content) => {
            Some(ActionResult::content(
                content, ContentType::from_path(&candidate)
            ))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!(
                "Failed to read UI file {}: {}", candidate.display(), err
            );
            None
        }
    }
}

/// Maps a request path to the file path to look for.
///
/// Requests that try to escape the asset root via parent components are
/// rejected outright.
fn candidate_path(root: &Path, path: &str) -> Option<PathBuf> {
    let rel = match path {
        "/" => "index.html",
        path => path.trim_start_matches('/'),
    };
    let rel = Path::new(rel);
    if rel.components().any(|item| {
        !matches!(item, Component::Normal(_) | Component::CurDir)
    }) {
        return None
    }
    Some(root.join(rel))
}


//============ Tests =========================================================
