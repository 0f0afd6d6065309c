//! Maps update file references to package files in the local content store.
//!
//! WSUS publishes content as `http://<server>:<port>/Content/<xx>/<hash>.cab`.
//! The same files live on disk under the content directory, so the URI path
//! after the `Content` segment is rebased onto the configured root.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use crate::wsus::UpdateRecord;

/// Only cabinet packages can be applied offline; `.psf` payloads and others
/// are ignored.
pub const PACKAGE_EXTENSION: &str = ".cab";

/// URI segment that the content root replaces.
const CONTENT_SEGMENT: &str = "Content";

/// Resolved packages keyed by local path, valued by the update title.
///
/// The first update that references a path wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Installables {
    packages: BTreeMap<PathBuf, String>,
}

impl Installables {
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn title(&self, path: &Path) -> Option<&str> {
        self.packages.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.packages
            .iter()
            .map(|(path, title)| (path.as_path(), title.as_str()))
    }
}

/// True if the reference names a cabinet package.
pub fn is_package(uri: &str) -> bool {
    let path = uri_path(uri);
    path.len()
        .checked_sub(PACKAGE_EXTENSION.len())
        .and_then(|start| path.get(start..))
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

/// Path component of a URI, or the input itself if it has no scheme.
fn uri_path(uri: &str) -> &str {
    let path = match uri.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => uri,
    };
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Rebase a content URI onto `content_root`, using the host separator.
///
/// Returns `None` if the URI has no `Content` segment, or if a `..` segment
/// would leave the content root.
pub fn local_path(uri: &str, content_root: &Path) -> Option<PathBuf> {
    let mut segments = uri_path(uri)
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .skip_while(|s| !s.eq_ignore_ascii_case(CONTENT_SEGMENT));
    segments.next()?;

    let mut path = content_root.to_path_buf();
    let mut pushed = false;
    for segment in segments {
        if segment == ".." || segment.contains(':') {
            return None;
        }
        path.push(segment);
        pushed = true;
    }
    pushed.then_some(path)
}

/// Resolve every package referenced by `updates` that exists under
/// `content_root`.
pub fn resolve(updates: &[UpdateRecord], content_root: &Path) -> Installables {
    let mut installables = Installables::default();

    for update in updates {
        for file in update.files.iter().filter(|f| is_package(&f.uri)) {
            let Some(path) = local_path(&file.uri, content_root) else {
                tracing::debug!(uri = %file.uri, "no content segment in file uri");
                continue;
            };
            if !path.is_file() {
                tracing::debug!(path = %path.display(), title = %update.title, "package not in content store");
                continue;
            }
            match installables.packages.entry(path) {
                Entry::Vacant(entry) => {
                    tracing::debug!(path = %entry.key().display(), title = %update.title, "resolved package");
                    entry.insert(update.title.clone());
                }
                Entry::Occupied(entry) => {
                    tracing::debug!(path = %entry.key().display(), title = %update.title, "duplicate package");
                }
            }
        }
    }

    installables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wsus::testing::record;

    fn store(root: &Path, rel: &[&str]) -> PathBuf {
        let mut path = root.to_path_buf();
        for seg in rel {
            path.push(seg);
        }
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"MSCF").unwrap();
        path
    }

    #[test]
    fn test_is_package_matches_cab_only() {
        assert!(is_package("http://wsus01:8530/Content/AB/ABCDEF.cab"));
        assert!(is_package("http://wsus01:8530/Content/AB/ABCDEF.CAB"));
        assert!(!is_package("http://wsus01:8530/Content/AB/ABCDEF.psf"));
        assert!(!is_package("http://wsus01:8530/Content/AB/cab"));
    }

    #[test]
    fn test_local_path_rebases_on_content_root() {
        let root = Path::new("/srv/WsusContent");
        assert_eq!(
            local_path("http://wsus01:8530/Content/AB/ABCDEF.cab", root),
            Some(root.join("AB").join("ABCDEF.cab"))
        );
        assert_eq!(local_path("http://wsus01:8530/Other/AB/ABCDEF.cab", root), None);
        assert_eq!(local_path("http://wsus01:8530/Content/", root), None);
    }

    #[test]
    fn test_local_path_stays_under_content_root() {
        let root = Path::new("/srv/WsusContent");
        assert_eq!(local_path("http://wsus01:8530/Content/../../etc/x.cab", root), None);
        assert_eq!(local_path("http://wsus01:8530/Content/AB/..\\x.cab", root), None);
        assert_eq!(local_path("http://wsus01:8530/Content/C:/x.cab", root), None);
        assert_eq!(
            local_path("http://wsus01:8530/Content/./AB/x.cab", root),
            Some(root.join("AB").join("x.cab"))
        );
    }

    #[test]
    fn test_resolve_skips_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cab = store(dir.path(), &["AB", "ABCDEF.cab"]);
        store(dir.path(), &["CD", "EXPRESS.psf"]);

        let updates = vec![record(
            "2024-01 Cumulative Update",
            &[
                "http://wsus01:8530/Content/AB/ABCDEF.cab",
                "http://wsus01:8530/Content/CD/EXPRESS.psf",
                "http://wsus01:8530/Content/EF/MISSING.cab",
            ],
        )];

        let installables = resolve(&updates, dir.path());
        assert_eq!(installables.len(), 1);
        assert_eq!(installables.title(&cab), Some("2024-01 Cumulative Update"));
    }

    #[test]
    fn test_resolve_first_reference_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cab = store(dir.path(), &["AB", "SHARED.cab"]);
        let uri = "http://wsus01:8530/Content/AB/SHARED.cab";

        let updates = vec![record("First", &[uri]), record("Second", &[uri])];
        let installables = resolve(&updates, dir.path());

        assert_eq!(installables.len(), 1);
        assert_eq!(installables.title(&cab), Some("First"));
    }
}
