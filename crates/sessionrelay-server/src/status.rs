//! `status/get` (§4.8) reports whether this client's agent is running and a
//! `RepoStatus` for the workspace. §6 says the indexer's git fields come
//! from session-log lines only; a live repo check here is a different
//! concern (is this *directory* a git work tree right now) so it is a
//! plain filesystem check rather than a second path into the index.

use std::path::Path;

use sessionrelay_types::RepoStatus;

pub fn resolve_repo_status(workspace_root: &Path) -> RepoStatus {
    if !workspace_root.is_dir() {
        return RepoStatus::RepoNotFound;
    }
    if workspace_root.join(".git").exists() {
        RepoStatus::Ok
    } else {
        RepoStatus::NotGitRepo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_repo_not_found() {
        assert_eq!(resolve_repo_status(Path::new("/no/such/dir")), RepoStatus::RepoNotFound);
    }

    #[test]
    fn directory_without_git_is_not_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_repo_status(dir.path()), RepoStatus::NotGitRepo);
    }

    #[test]
    fn directory_with_git_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert_eq!(resolve_repo_status(dir.path()), RepoStatus::Ok);
    }
}
