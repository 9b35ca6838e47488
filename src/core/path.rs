//! Sync root relative paths.

use std::path::{Component, Path, PathBuf};

use super::error::EncodingError;

/// Make `path` relative to `root` and render it with forward slashes.
///
/// `.` and `..` are resolved lexically in both paths first; symlinks are not
/// followed. The result is what the device-side agent sees as the file name,
/// so it never contains `..`, a root, or a platform separator.
pub fn relative_path(path: &Path, root: &Path) -> Result<String, EncodingError> {
    let outside = || EncodingError::OutsideSyncRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let normalized = normalize(path);
    let stripped = normalized
        .strip_prefix(normalize(root))
        .map_err(|_| outside())?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| EncodingError::NonUtf8Path(path.to_path_buf()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(outside());
            }
        }
    }

    if parts.is_empty() {
        return Err(EncodingError::EmptyPath(path.to_path_buf()));
    }

    Ok(parts.join("/"))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_path_root_file() {
        let root = PathBuf::from("/project/platforms/app");
        let rel = relative_path(&root.join("test.js"), &root).unwrap();
        assert_eq!(rel, "test.js");
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = PathBuf::from("/project/platforms/app");
        let path = root.join("testdir").join("nested").join("testdir.js");
        assert_eq!(relative_path(&path, &root).unwrap(), "testdir/nested/testdir.js");
    }

    #[test]
    fn test_relative_path_outside_root() {
        let root = PathBuf::from("/project/platforms/app");
        let err = relative_path(Path::new("/elsewhere/test.js"), &root).unwrap_err();
        assert!(matches!(err, EncodingError::OutsideSyncRoot { .. }));
    }

    #[test]
    fn test_relative_path_rejects_parent_escape() {
        let root = PathBuf::from("/project/platforms/app");
        let path = root.join("..").join("secret.js");
        let err = relative_path(&path, &root).unwrap_err();
        assert!(matches!(err, EncodingError::OutsideSyncRoot { .. }));

        let path = root.join("testdir").join("..").join("..").join("app2").join("x.js");
        let err = relative_path(&path, &root).unwrap_err();
        assert!(matches!(err, EncodingError::OutsideSyncRoot { .. }));
    }

    #[test]
    fn test_relative_path_resolves_dot_segments() {
        let root = PathBuf::from("/project/app");
        assert_eq!(
            relative_path(Path::new("/project/app/a/../b.js"), &root).unwrap(),
            "b.js"
        );
        assert_eq!(
            relative_path(Path::new("/project/app/./testdir/./testdir.js"), &root).unwrap(),
            "testdir/testdir.js"
        );
        assert_eq!(
            relative_path(Path::new("/project/app/b.js"), Path::new("/project/x/../app")).unwrap(),
            "b.js"
        );
    }

    #[test]
    fn test_relative_path_root_itself() {
        let root = PathBuf::from("/project/platforms/app");
        let err = relative_path(&root, &root).unwrap_err();
        assert!(matches!(err, EncodingError::EmptyPath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_path_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = PathBuf::from("/project");
        let path = root.join(OsStr::from_bytes(b"bad\xff.js"));
        let err = relative_path(&path, &root).unwrap_err();
        assert!(matches!(err, EncodingError::NonUtf8Path(_)));
    }
}
