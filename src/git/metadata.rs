use std::path::Path;

use tracing::debug;

use crate::errors::WardenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub commit: String,
    /// `None` on a detached HEAD.
    pub branch: Option<String>,
}

/// HEAD commit and branch for a git work tree, or `None` when the path is
/// not a repository or has no commits yet.
pub fn repo_metadata(repo_path: &Path) -> Option<RepoMetadata> {
    match read_head(repo_path) {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!(path = %repo_path.display(), error = %e, "No git metadata");
            None
        }
    }
}

fn read_head(repo_path: &Path) -> Result<RepoMetadata, WardenError> {
    let repo = git2::Repository::open(repo_path)
        .map_err(|e| WardenError::Git(format!("Failed to open repo: {}", e)))?;

    let head = repo
        .head()
        .map_err(|e| WardenError::Git(format!("No HEAD: {}", e)))?;

    let commit = head
        .peel_to_commit()
        .map_err(|e| WardenError::Git(format!("HEAD not a commit: {}", e)))?;

    let branch = if head.is_branch() {
        head.shorthand().map(str::to_string)
    } else {
        None
    };

    Ok(RepoMetadata { commit: commit.id().to_string(), branch })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_with_commit(path: &Path) -> git2::Oid {
        let repo = git2::Repository::init(path).unwrap();
        std::fs::write(path.join("README.md"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let sig = git2::Signature::now("scanwarden", "scanwarden@localhost").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap()
    }

    #[test]
    fn test_metadata_from_repo() {
        let dir = tempfile::tempdir().unwrap();
        let oid = init_with_commit(dir.path());
        let meta = repo_metadata(dir.path()).unwrap();
        assert_eq!(meta.commit, oid.to_string());
        assert!(meta.branch.is_some());
    }

    #[test]
    fn test_not_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(repo_metadata(dir.path()).is_none());
    }

    #[test]
    fn test_repo_without_commits() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        assert!(repo_metadata(dir.path()).is_none());
    }
}
