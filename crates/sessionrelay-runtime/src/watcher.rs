//! Filesystem watch primitive shared by the session streamer (C4).
//!
//! A `FileWatch` installs a `notify::PollWatcher` on a file's parent
//! directory and forwards every create/modify event touching the watched
//! path to a plain `std::sync::mpsc` channel. The actual debounce/poll
//! timing lives in the streamer; this type only bridges `notify`'s
//! callback-driven API into something a blocking loop can `recv()` from.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};

use crate::error::Result;

/// A change observed on the watched path, or a fatal error from the watch
/// worker thread (including a caught panic).
#[derive(Debug, Clone)]
pub enum WatchSignal {
    Changed,
    WorkerFailed(String),
}

pub struct FileWatch {
    _watcher: PollWatcher,
    rx: Receiver<WatchSignal>,
}

impl FileWatch {
    /// Watches the parent directory of `path` and reports every
    /// create/modify event that names `path` itself.
    pub fn watch(path: &Path) -> Result<Self> {
        let watch_dir = path.parent().unwrap_or(path).to_path_buf();
        let target = path.to_path_buf();

        let (tx_fs, rx_fs) = channel::<Event>();
        let (tx_out, rx_out) = channel::<WatchSignal>();

        let config = notify::Config::default().with_poll_interval(Duration::from_millis(500));
        let mut watcher = PollWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx_fs.send(event);
                }
            },
            config,
        )?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        spawn_worker(rx_fs, tx_out, target);

        Ok(Self {
            _watcher: watcher,
            rx: rx_out,
        })
    }

    pub fn receiver(&self) -> &Receiver<WatchSignal> {
        &self.rx
    }
}

fn spawn_worker(rx_fs: Receiver<Event>, tx_out: Sender<WatchSignal>, target: PathBuf) {
    let tx_worker = tx_out.clone();
    let spawned = std::thread::Builder::new()
        .name("session-file-watch".to_string())
        .spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                while let Ok(event) = rx_fs.recv() {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        continue;
                    }
                    if event.paths.iter().any(|p| p == &target) {
                        let _ = tx_worker.send(WatchSignal::Changed);
                    }
                }
            }));

            if let Err(panic_err) = result {
                let panic_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "watch worker panicked with unknown error".to_string()
                };
                let _ = tx_worker.send(WatchSignal::WorkerFailed(panic_msg));
            }
        });

    if let Err(err) = spawned {
        let _ = tx_out.send(WatchSignal::WorkerFailed(format!(
            "failed to spawn watch worker: {}",
            err
        )));
    }
}
