//! The session index cache (§4.3): an in-memory, mtime-leased cache over the
//! sessions root. Not backed by SQLite — the cache is entirely ephemeral and
//! rebuilt from the on-disk logs on every refresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use sessionrelay_core::{encode_project_path, is_session_file_name};
use sessionrelay_types::{ProjectSummary, SessionIndexEntry};

use crate::error::{Error, Result};
use crate::head::parse_head;

const DEFAULT_LEASE: Duration = Duration::from_secs(30);
const HEAD_LINE_LIMIT: usize = 1000;

struct CachedFile {
    mtime_ms: i64,
    entry: SessionIndexEntry,
}

#[derive(Default)]
struct Indices {
    by_project: HashMap<String, Vec<SessionIndexEntry>>,
    summaries: HashMap<String, ProjectSummary>,
}

/// Bundle returned by [`IndexCache::get_project_index`]: a project's
/// aggregate summary alongside its sessions, sorted newest-first.
#[derive(Debug, Clone)]
pub struct ProjectIndex {
    pub summary: ProjectSummary,
    pub sessions: Vec<SessionIndexEntry>,
}

struct Inner {
    per_file: HashMap<PathBuf, CachedFile>,
    indices: Indices,
    last_refresh: Option<Instant>,
}

pub struct IndexCache {
    sessions_root: PathBuf,
    lease: Duration,
    inner: RwLock<Inner>,
}

impl IndexCache {
    pub fn new(sessions_root: PathBuf) -> Self {
        Self::with_lease(sessions_root, DEFAULT_LEASE)
    }

    pub fn with_lease(sessions_root: PathBuf, lease: Duration) -> Self {
        Self {
            sessions_root,
            lease,
            inner: RwLock::new(Inner {
                per_file: HashMap::new(),
                indices: Indices::default(),
                last_refresh: None,
            }),
        }
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.refresh_if_needed()?;
        let inner = self.inner.read().expect("index cache lock poisoned");
        let mut summaries: Vec<ProjectSummary> = inner.indices.summaries.values().cloned().collect();
        summaries.sort_by(|a, b| b.most_recent_activity.cmp(&a.most_recent_activity));
        Ok(summaries)
    }

    pub fn get_project_index(&self, project_path: &str) -> Result<Option<ProjectIndex>> {
        self.refresh_if_needed()?;
        let key = encode_project_path(project_path);
        let inner = self.inner.read().expect("index cache lock poisoned");
        let (Some(summary), Some(sessions)) =
            (inner.indices.summaries.get(&key), inner.indices.by_project.get(&key))
        else {
            return Ok(None);
        };
        Ok(Some(ProjectIndex { summary: summary.clone(), sessions: sessions.clone() }))
    }

    /// Falls back to a prefix-descendant match when no exact key is cached (§4.3).
    pub fn get_sessions_for_project(&self, project_path: &str) -> Result<Vec<SessionIndexEntry>> {
        self.refresh_if_needed()?;
        let key = encode_project_path(project_path);
        let inner = self.inner.read().expect("index cache lock poisoned");
        if let Some(entries) = inner.indices.by_project.get(&key) {
            return Ok(entries.clone());
        }
        let mut matches: Vec<SessionIndexEntry> = inner
            .indices
            .by_project
            .values()
            .flatten()
            .filter(|entry| is_descendant(&entry.project_path, project_path))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(matches)
    }

    pub fn get_all_sessions(&self) -> Result<Vec<SessionIndexEntry>> {
        self.refresh_if_needed()?;
        let inner = self.inner.read().expect("index cache lock poisoned");
        let mut entries: Vec<SessionIndexEntry> =
            inner.indices.by_project.values().flatten().cloned().collect();
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    pub fn find_session_by_id(&self, id: &str) -> Result<Option<SessionIndexEntry>> {
        self.refresh_if_needed()?;
        let inner = self.inner.read().expect("index cache lock poisoned");
        let all: Vec<&SessionIndexEntry> = inner.indices.by_project.values().flatten().collect();
        if let Some(exact) = all.iter().find(|e| e.session_id == id) {
            return Ok(Some((*exact).clone()));
        }
        let mut matches = all.into_iter().filter(|e| e.session_id.starts_with(id));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if matches.next().is_some() {
            return Err(Error::AmbiguousSessionId(id.to_string()));
        }
        Ok(Some(first.clone()))
    }

    pub fn invalidate_by_path(&self, path: &Path) {
        let mut inner = self.inner.write().expect("index cache lock poisoned");
        inner.per_file.remove(path);
    }

    pub fn refresh_if_needed(&self) -> Result<()> {
        let stale = {
            let inner = self.inner.read().expect("index cache lock poisoned");
            match inner.last_refresh {
                Some(at) => at.elapsed() >= self.lease,
                None => true,
            }
        };
        if stale {
            self.refresh()?;
        }
        Ok(())
    }

    /// Walks the sessions root and rebuilds the cache, bypassing the lease (§4.3).
    pub fn refresh(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        let mut fresh_per_file = HashMap::new();

        let stale_entries: Vec<(PathBuf, i64, SessionIndexEntry)> = {
            let inner = self.inner.read().expect("index cache lock poisoned");
            inner
                .per_file
                .iter()
                .map(|(path, cached)| (path.clone(), cached.mtime_ms, cached.entry.clone()))
                .collect()
        };
        let stale_by_path: HashMap<PathBuf, (i64, SessionIndexEntry)> = stale_entries
            .into_iter()
            .map(|(path, mtime_ms, entry)| (path, (mtime_ms, entry)))
            .collect();

        for path in walk_session_files(&self.sessions_root) {
            let metadata = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };
            let mtime_ms = file_mtime_ms(&metadata);
            seen.insert(path.clone());

            if let Some((cached_mtime, cached_entry)) = stale_by_path.get(&path) {
                if *cached_mtime == mtime_ms {
                    fresh_per_file.insert(path, CachedFile { mtime_ms, entry: cached_entry.clone() });
                    continue;
                }
            }

            if let Ok(entry) = parse_head(&path, mtime_ms, metadata.len(), HEAD_LINE_LIMIT) {
                fresh_per_file.insert(path, CachedFile { mtime_ms, entry });
            }
        }

        let indices = build_indices(fresh_per_file.values().map(|c| &c.entry));

        let mut inner = self.inner.write().expect("index cache lock poisoned");
        inner.per_file = fresh_per_file;
        inner.indices = indices;
        inner.last_refresh = Some(Instant::now());
        Ok(())
    }
}

fn build_indices<'a>(entries: impl Iterator<Item = &'a SessionIndexEntry>) -> Indices {
    let mut grouped: HashMap<String, Vec<SessionIndexEntry>> = HashMap::new();
    for entry in entries {
        let key = encode_project_path(&entry.project_path);
        grouped.entry(key).or_default().push(entry.clone());
    }
    let mut summaries = HashMap::new();
    for (key, entries) in grouped.iter_mut() {
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        if let Some(project_path) = entries.first().map(|e| e.project_path.clone()) {
            if let Some(summary) = ProjectSummary::from_sorted_entries(&project_path, entries.as_slice()) {
                summaries.insert(key.clone(), summary);
            }
        }
    }
    Indices { by_project: grouped, summaries }
}

fn walk_session_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_session_file_name))
        .map(|entry| entry.into_path())
        .collect()
}

fn file_mtime_ms(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn is_descendant(project_path: &str, ancestor: &str) -> bool {
    Path::new(project_path).starts_with(Path::new(ancestor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_session(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn refresh_groups_sessions_by_project() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "rollout-1.jsonl",
            &[
                r#"{"timestamp":"2026-01-31T12:00:00Z","type":"session_meta","payload":{"id":"s1","cwd":"/repo/a","originator":"codex","cli_version":"1.0.0"}}"#,
                r#"{"timestamp":"2026-01-31T12:00:01Z","type":"response_item","payload":{"type":"message","role":"user","content":"hello"}}"#,
            ],
        );
        let cache = IndexCache::new(tmp.path().to_path_buf());
        cache.refresh().unwrap();
        let projects = cache.list_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].project_path, "/repo/a");
        assert_eq!(projects[0].session_count, 1);
    }

    #[test]
    fn unchanged_mtime_reuses_cached_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_session(
            tmp.path(),
            "rollout-2.jsonl",
            &[r#"{"timestamp":"2026-01-31T12:00:00Z","type":"session_meta","payload":{"id":"s2","cwd":"/repo/b","originator":"codex","cli_version":"1.0.0"}}"#],
        );
        let metadata = std::fs::metadata(&path).unwrap();
        let original_mtime = filetime::FileTime::from_last_modification_time(&metadata);

        let cache = IndexCache::new(tmp.path().to_path_buf());
        cache.refresh().unwrap();
        let before = cache.get_all_sessions().unwrap();

        // Restore the original mtime even though disk contents could have been
        // rewritten meanwhile; the cache must keep serving the old entry.
        filetime::set_file_mtime(&path, original_mtime).unwrap();
        cache.refresh().unwrap();
        let after = cache.get_all_sessions().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn deleted_file_is_evicted_on_refresh() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_session(
            tmp.path(),
            "rollout-3.jsonl",
            &[r#"{"timestamp":"2026-01-31T12:00:00Z","type":"session_meta","payload":{"id":"s3","cwd":"/repo/c","originator":"codex","cli_version":"1.0.0"}}"#],
        );
        let cache = IndexCache::new(tmp.path().to_path_buf());
        cache.refresh().unwrap();
        assert_eq!(cache.get_all_sessions().unwrap().len(), 1);

        std::fs::remove_file(&path).unwrap();
        cache.refresh().unwrap();
        assert_eq!(cache.get_all_sessions().unwrap().len(), 0);
    }

    #[test]
    fn prefix_fallback_finds_descendant_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "rollout-4.jsonl",
            &[r#"{"timestamp":"2026-01-31T12:00:00Z","type":"session_meta","payload":{"id":"s4","cwd":"/repo/sub/dir","originator":"codex","cli_version":"1.0.0"}}"#],
        );
        let cache = IndexCache::new(tmp.path().to_path_buf());
        cache.refresh().unwrap();
        let sessions = cache.get_sessions_for_project("/repo").unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn find_by_unambiguous_prefix_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "rollout-5.jsonl",
            &[r#"{"timestamp":"2026-01-31T12:00:00Z","type":"session_meta","payload":{"id":"abcdef","cwd":"/repo/d","originator":"codex","cli_version":"1.0.0"}}"#],
        );
        let cache = IndexCache::new(tmp.path().to_path_buf());
        cache.refresh().unwrap();
        let found = cache.find_session_by_id("abc").unwrap();
        assert_eq!(found.unwrap().session_id, "abcdef");
    }
}
