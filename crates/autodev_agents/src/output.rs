//! Writing generated files below an output directory.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{AgentError, AgentResult};

/// Resolve `relative` below `root`.
///
/// A leading `/` is stripped. Paths containing `..`, a drive prefix or a
/// root component after stripping are rejected.
pub fn safe_join(root: &Path, relative: &str) -> AgentResult<PathBuf> {
    let trimmed = relative.trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(AgentError::UnsafePath(relative.to_string()));
    }

    let mut path = root.to_path_buf();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AgentError::UnsafePath(relative.to_string()));
            }
        }
    }
    Ok(path)
}

/// Write `content` to `root/relative`, creating parent directories.
pub async fn write_file(root: &Path, relative: &str, content: &str) -> AgentResult<PathBuf> {
    let path = safe_join(root, relative)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_join() {
        let root = Path::new("/tmp/out");
        assert_eq!(safe_join(root, "src/main.py").unwrap(), root.join("src/main.py"));
        assert_eq!(safe_join(root, "/etc/app.py").unwrap(), root.join("etc/app.py"));
        assert_eq!(safe_join(root, "./a.py").unwrap(), root.join("a.py"));
        assert!(matches!(safe_join(root, "../escape.py"), Err(AgentError::UnsafePath(_))));
        assert!(safe_join(root, "a/../../b").is_err());
        assert!(safe_join(root, "/").is_err());
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "pkg/mod/x.py", "print(1)").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print(1)");
    }
}
