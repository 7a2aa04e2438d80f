//! Tree traversal.
//!
//! Both entry points follow symbolic links. Traversal order is whatever the
//! filesystem yields; consumers needing determinism sort explicitly.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::languoids::languoid::{Languoid, LanguoidError, NodeCache};

/// Depth-first search for the directory named `glottocode` under `tree`.
///
/// A miss is an ordinary `Ok(None)`, distinct from the structural errors a
/// malformed hit would raise.
pub fn find_languoid(tree: &Path, glottocode: &str) -> Result<Option<Languoid>, LanguoidError> {
    for entry in WalkDir::new(tree).follow_links(true) {
        let entry = entry.map_err(|e| LanguoidError::Io(e.to_string()))?;
        if entry.file_type().is_dir() && entry.file_name() == glottocode {
            let mut cache = NodeCache::new();
            return Languoid::from_dir(entry.path(), &mut cache).map(Some);
        }
    }
    Ok(None)
}

/// Lazily load every languoid below `tree`, one per descriptor file.
///
/// The caller owns the `cache`; one traversal shares it so each ancestor is
/// parsed once. Restart a walk by calling again (with the same cache, if the
/// memoization should carry over). Not meant for concurrent callers -- give
/// each traversal its own cache.
pub fn walk_tree<'a>(
    tree: &Path,
    cache: &'a mut NodeCache,
) -> impl Iterator<Item = Result<Languoid, LanguoidError>> + 'a {
    WalkDir::new(tree)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().map_or(false, |ext| ext == "ini")
                {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(LanguoidError::Io(e.to_string()))),
        })
        .map(move |path: Result<PathBuf, LanguoidError>| {
            path.and_then(|p| Languoid::from_ini(&p, cache))
        })
}
