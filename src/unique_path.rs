//! Collision-free destination names.
//!
//! Uniqueness is checked against one directory at the moment of the call.
//! Nothing is locked; the tool processes one file at a time.

use std::fs;
use std::path::Path;

/// True when anything occupies `path`, dangling symlinks included.
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Returns `candidate_stem` if `{dest_dir}/{candidate_stem}{extension}` is
/// free, otherwise the first free `{candidate_stem}-{n}` for n = 1, 2, …
///
/// ```no_run
/// use datedir::unique_path::resolve;
/// use std::path::Path;
///
/// let stem = resolve(Path::new("/out/2022/videos"), "2022-01-01 00.00.00", ".mp4");
/// println!("{stem}.mp4");
/// ```
pub fn resolve(dest_dir: &Path, candidate_stem: &str, extension: &str) -> String {
    resolve_with(dest_dir, candidate_stem, extension, is_occupied)
}

/// [`resolve`] with a caller-supplied occupancy check.
pub fn resolve_with<F>(dest_dir: &Path, candidate_stem: &str, extension: &str, mut occupied: F) -> String
where
    F: FnMut(&Path) -> bool,
{
    if !occupied(&dest_dir.join(format!("{candidate_stem}{extension}"))) {
        return candidate_stem.to_string();
    }

    let mut counter: u64 = 1;
    loop {
        let stem = format!("{candidate_stem}-{counter}");
        if !occupied(&dest_dir.join(format!("{stem}{extension}"))) {
            tracing::debug!(candidate = candidate_stem, resolved = %stem, "name collision resolved");
            return stem;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_free_name_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve(temp_dir.path(), "notes", ".txt"), "notes");
    }

    #[test]
    fn test_missing_directory_is_free() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("2022").join("videos");
        assert_eq!(resolve(&dir, "clip", ".mp4"), "clip");
    }

    #[test]
    fn test_suffixes_increase_without_gaps() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let stem = "2022-01-01 00.00.00";

        let mut resolved = Vec::new();
        for _ in 0..4 {
            let unique = resolve(dir, stem, ".mp4");
            let path = dir.join(format!("{unique}.mp4"));
            assert!(!path.exists());
            fs::write(&path, b"x").unwrap();
            resolved.push(unique);
        }

        assert_eq!(
            resolved,
            vec![
                "2022-01-01 00.00.00",
                "2022-01-01 00.00.00-1",
                "2022-01-01 00.00.00-2",
                "2022-01-01 00.00.00-3",
            ]
        );
    }

    #[test]
    fn test_extension_is_part_of_collision() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(resolve(temp_dir.path(), "notes", ".pdf"), "notes");
        assert_eq!(resolve(temp_dir.path(), "notes", ".txt"), "notes-1");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_counts_as_occupied() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("nowhere"),
            temp_dir.path().join("link.jpg"),
        )
        .unwrap();
        assert_eq!(resolve(temp_dir.path(), "link", ".jpg"), "link-1");
    }

    #[test]
    fn test_resolve_with_reserved_names() {
        let dir = Path::new("/out/2021/photos");
        let reserved: HashSet<PathBuf> = [dir.join("a.jpg"), dir.join("a-1.jpg")].into();
        let stem = resolve_with(dir, "a", ".jpg", |p| reserved.contains(p));
        assert_eq!(stem, "a-2");
    }
}
