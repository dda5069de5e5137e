//! M3U playlist assembly

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::DownloadError;
use crate::utils::sanitize::sanitize_component;

/// Deepest directory containing every given path.
pub fn common_ancestor<'a>(paths: impl IntoIterator<Item = &'a Path>) -> PathBuf {
    let mut iter = paths.into_iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };

    let mut ancestor: Vec<_> = first
        .parent()
        .map(|parent| parent.components().collect())
        .unwrap_or_default();

    for path in iter {
        let parent: Vec<_> = path
            .parent()
            .map(|parent| parent.components().collect())
            .unwrap_or_default();
        let shared = ancestor
            .iter()
            .zip(parent.iter())
            .take_while(|(a, b)| a == b)
            .count();
        ancestor.truncate(shared);
    }

    ancestor.into_iter().collect()
}

/// Build playlist content: the `#EXTM3U` header, then one sorted path per
/// line, relativized to `base` when given.
pub fn build_playlist(paths: &BTreeSet<PathBuf>, base: Option<&Path>) -> String {
    let mut entries: Vec<String> = paths
        .iter()
        .map(|path| {
            let entry = base.and_then(|b| path.strip_prefix(b).ok()).unwrap_or(path);
            entry.to_string_lossy().into_owned()
        })
        .collect();
    entries.sort();

    let mut content = String::from("#EXTM3U\n");
    for entry in entries {
        content.push_str(&entry);
        content.push('\n');
    }
    content
}

/// Assemble and write `<title>.m3u8` into the saved files' common
/// ancestor directory.
///
/// Returns `None` without writing when fewer than two distinct paths were
/// saved. Entries are deduplicated, sorted lexicographically, and
/// relativized to the common ancestor unless `resolve_full_path` keeps
/// them as given.
pub async fn assemble_playlist(
    saved: &[PathBuf],
    title: &str,
    resolve_full_path: bool,
) -> Result<Option<PathBuf>, DownloadError> {
    let unique: BTreeSet<PathBuf> = saved.iter().cloned().collect();
    if unique.len() < 2 {
        debug!("skipping playlist, only {} distinct file(s)", unique.len());
        return Ok(None);
    }

    let dir = common_ancestor(unique.iter().map(PathBuf::as_path));
    let base = (!resolve_full_path).then_some(dir.as_path());
    let content = build_playlist(&unique, base);

    let file = dir.join(format!("{}.m3u8", sanitize_component(title)));
    fs::write(&file, content).await?;
    debug!("wrote playlist: {} ({} entries)", file.display(), unique.len());
    Ok(Some(file))
}
