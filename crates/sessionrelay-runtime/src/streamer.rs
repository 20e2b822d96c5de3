//! Per-session file streamer (C4): watches a single session file for
//! growth and publishes normalized items as `claude_message` events.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sessionrelay_core::LineReader;
use sessionrelay_normalize::{format_explored_summary, normalize_line, summarize_tool_use};
use sessionrelay_types::{
    BridgeEvent, ContentBlock, ConversationItem, EventPayload, Role, StreamReadCompletePayload,
};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::watcher::{FileWatch, WatchSignal};

const MAX_WAKE: Duration = Duration::from_secs(1);

/// The subset of [`RuntimeConfig`] the streamer's own wake-up loop needs,
/// copied out so the loop doesn't hold a reference across thread hand-off.
#[derive(Clone, Copy)]
struct Timing {
    debounce: Duration,
    poll_quiet: Duration,
    read_complete_quiescence: Duration,
}

impl From<&RuntimeConfig> for Timing {
    fn from(config: &RuntimeConfig) -> Self {
        Timing {
            debounce: config.debounce(),
            poll_quiet: config.poll_quiet(),
            read_complete_quiescence: config.read_complete_quiescence(),
        }
    }
}

struct State {
    resume_offset: u64,
    next_line_number: u64,
    message_count: u64,
    last_event: Option<Instant>,
    debounce_deadline: Option<Instant>,
    read_complete_deadline: Option<Instant>,
    pending_size: u64,
    explored_batch: Vec<String>,
    last_thinking_text: Option<String>,
    last_thinking_at: Option<DateTime<Utc>>,
}

impl State {
    fn new() -> Self {
        State {
            resume_offset: 0,
            next_line_number: 0,
            message_count: 0,
            last_event: None,
            debounce_deadline: None,
            read_complete_deadline: None,
            pending_size: 0,
            explored_batch: Vec::new(),
            last_thinking_text: None,
            last_thinking_at: None,
        }
    }
}

/// Streams a single session file, publishing normalized items on a plain
/// `std::sync::mpsc` channel. Forwarding that channel into the hub is the
/// caller's job, not this type's — see `SessionWatchRegistry::watch`.
pub struct SessionStreamer {
    _handle: JoinHandle<()>,
    rx: Receiver<BridgeEvent>,
    cancel: Arc<AtomicBool>,
}

impl SessionStreamer {
    pub fn attach(session_id: String, path: PathBuf, agent_type: Option<String>) -> Result<Self> {
        Self::attach_with_config(session_id, path, agent_type, &RuntimeConfig::default())
    }

    /// Same as [`attach`](Self::attach), but with the debounce/quiescence
    /// timing drawn from `config` instead of the built-in defaults.
    pub fn attach_with_config(
        session_id: String,
        path: PathBuf,
        agent_type: Option<String>,
        config: &RuntimeConfig,
    ) -> Result<Self> {
        let watch = FileWatch::watch(&path)?;
        let (tx_out, rx_out) = channel::<BridgeEvent>();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_thread = cancel.clone();
        let timing = Timing::from(config);

        let handle = std::thread::Builder::new()
            .name("session-streamer".to_string())
            .spawn(move || run_loop(watch, path, session_id, agent_type, timing, tx_out, cancel_for_thread))?;

        Ok(Self {
            _handle: handle,
            rx: rx_out,
            cancel,
        })
    }

    pub fn receiver(&self) -> &Receiver<BridgeEvent> {
        &self.rx
    }

    /// Stops the watch loop, closes the file handle, and drops the pending
    /// read-complete timer and de-dup state along with it.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Splits off the owned receiving half so a caller can move it onto
    /// another thread (e.g. to bridge several sessions' output into one
    /// hub), while keeping a handle that still stops the watch loop on
    /// drop.
    pub fn into_parts(self) -> (StreamerHandle, Receiver<BridgeEvent>) {
        // `self` implements `Drop`, so its fields can't be moved out
        // directly; read them out via `ManuallyDrop` instead, which
        // suppresses `SessionStreamer::drop` on `this` entirely (the
        // thread-stopping behavior it provides moves over to
        // `StreamerHandle`'s own `Drop` impl).
        let this = std::mem::ManuallyDrop::new(self);
        let handle = unsafe { std::ptr::read(&this._handle) };
        let cancel = unsafe { std::ptr::read(&this.cancel) };
        let rx = unsafe { std::ptr::read(&this.rx) };
        (StreamerHandle { _handle: handle, cancel }, rx)
    }
}

impl Drop for SessionStreamer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The non-channel half of a split [`SessionStreamer`]: owns the watch
/// thread and stops it on drop, same as `SessionStreamer` itself.
pub struct StreamerHandle {
    _handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

impl StreamerHandle {
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

impl Drop for StreamerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    watch: FileWatch,
    path: PathBuf,
    session_id: String,
    agent_type: Option<String>,
    timing: Timing,
    tx: Sender<BridgeEvent>,
    cancel: Arc<AtomicBool>,
) {
    let mut state = State::new();

    // Prime from the current end of file: streaming only cares about growth
    // from the moment it attaches, not historical content (that's C3's job).
    state.resume_offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    while !cancel.load(Ordering::Relaxed) {
        let timeout = next_wake(&state);
        match watch.receiver().recv_timeout(timeout) {
            Ok(WatchSignal::Changed) => {
                let now = Instant::now();
                state.last_event = Some(now);
                state.debounce_deadline = Some(now + timing.debounce);
                state.read_complete_deadline = None;
            }
            Ok(WatchSignal::WorkerFailed(msg)) => {
                sessionrelay_core::log::warn("streamer", &format!("watch worker for {} failed: {}", path.display(), msg));
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        // The debounce and the 1s-poll/quiet backstop both boil down to
        // "enough time has passed since the last write"; recv_timeout is
        // capped at MAX_WAKE so the backstop is never more than 1s late.
        let debounce_due = state.debounce_deadline.is_some_and(|d| now >= d);
        let poll_backstop = state
            .debounce_deadline
            .is_some()
            .then(|| state.last_event)
            .flatten()
            .is_some_and(|t| now.duration_since(t) >= timing.poll_quiet);
        if debounce_due || poll_backstop {
            state.debounce_deadline = None;
            if let Err(err) = process_changes(&path, &session_id, agent_type.as_deref(), timing, &mut state, &tx) {
                sessionrelay_core::log::warn("streamer", &format!("reading {} failed: {}", path.display(), err));
            }
        }

        if state.read_complete_deadline.is_some_and(|d| now >= d) {
            flush_read_complete(&session_id, agent_type.as_deref(), &mut state, &tx);
        }
    }
}

fn next_wake(state: &State) -> Duration {
    let now = Instant::now();
    let mut wait = MAX_WAKE;
    if let Some(deadline) = state.debounce_deadline {
        wait = wait.min(deadline.saturating_duration_since(now));
    }
    if let Some(deadline) = state.read_complete_deadline {
        wait = wait.min(deadline.saturating_duration_since(now));
    }
    wait.max(Duration::from_millis(1))
}

fn process_changes(
    path: &Path,
    session_id: &str,
    agent_type: Option<&str>,
    timing: Timing,
    state: &mut State,
    tx: &Sender<BridgeEvent>,
) -> Result<()> {
    let size = std::fs::metadata(path)?.len();
    if size <= state.resume_offset {
        return Ok(());
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(state.resume_offset))?;
    let reader = LineReader::new(BufReader::new(file));

    for line in reader {
        let line = line?;
        state.resume_offset += line.bytes_read;
        if line.too_long {
            continue;
        }
        let trimmed = line.data.trim();
        if trimmed.is_empty() {
            continue;
        }
        state.next_line_number += 1;
        let item = match normalize_line(trimmed, state.next_line_number) {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            Err(err) => {
                sessionrelay_core::log::debug("streamer", &format!("skipping malformed line: {}", err));
                continue;
            }
        };
        handle_item(session_id, agent_type, state, item, tx);
    }

    if state.resume_offset >= size {
        state.pending_size = size;
        state.read_complete_deadline = Some(Instant::now() + timing.read_complete_quiescence);
    } else {
        state.read_complete_deadline = None;
    }
    Ok(())
}

fn handle_item(
    session_id: &str,
    agent_type: Option<&str>,
    state: &mut State,
    item: ConversationItem,
    tx: &Sender<BridgeEvent>,
) {
    if item.has_only_tool_blocks() {
        for block in &item.content {
            if let ContentBlock::ToolUse { tool_name, tool_input, .. } = block {
                let summary = summarize_tool_use(tool_name, tool_input);
                if !summary.is_empty() {
                    state.explored_batch.push(summary);
                }
            }
        }
        return;
    }

    flush_explored_batch(session_id, agent_type, state, tx);

    if let Some(text) = item.sole_thinking_text() {
        let text = text.trim();
        let is_duplicate = match (&state.last_thinking_text, state.last_thinking_at) {
            (Some(last_text), Some(last_at)) => {
                last_text == text && (item.timestamp - last_at).num_milliseconds().abs() <= 2_000
            }
            _ => false,
        };
        if is_duplicate {
            return;
        }
        state.last_thinking_text = Some(text.to_string());
        state.last_thinking_at = Some(item.timestamp);
    }

    emit_message(session_id, agent_type, state, item, tx);
}

fn flush_explored_batch(session_id: &str, agent_type: Option<&str>, state: &mut State, tx: &Sender<BridgeEvent>) {
    if state.explored_batch.is_empty() {
        return;
    }
    let summary = format_explored_summary(&state.explored_batch);
    state.explored_batch.clear();
    let item = ConversationItem {
        line: state.next_line_number,
        timestamp: Utc::now(),
        role: Role::Assistant,
        is_context_compaction: false,
        is_turn_aborted: false,
        content: vec![ContentBlock::text(summary)],
    };
    emit_message(session_id, agent_type, state, item, tx);
}

fn flush_read_complete(session_id: &str, agent_type: Option<&str>, state: &mut State, tx: &Sender<BridgeEvent>) {
    flush_explored_batch(session_id, agent_type, state, tx);
    let payload = StreamReadCompletePayload {
        message_count: state.message_count,
        offset: state.resume_offset,
        size: state.pending_size,
    };
    let mut event = BridgeEvent::new(EventPayload::StreamReadComplete(payload)).with_session(session_id.to_string());
    event.agent_type = agent_type.map(|s| s.to_string());
    let _ = tx.send(event);
    state.read_complete_deadline = None;
}

fn emit_message(session_id: &str, agent_type: Option<&str>, state: &mut State, item: ConversationItem, tx: &Sender<BridgeEvent>) {
    state.message_count += 1;
    let mut event = BridgeEvent::new(EventPayload::ClaudeMessage(item)).with_session(session_id.to_string());
    event.agent_type = agent_type.map(|s| s.to_string());
    let _ = tx.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: Vec<ContentBlock>) -> ConversationItem {
        ConversationItem {
            line: 1,
            timestamp: Utc::now(),
            role: Role::Assistant,
            is_context_compaction: false,
            is_turn_aborted: false,
            content,
        }
    }

    #[test]
    fn explored_batch_accumulates_tool_use_summaries() {
        let (tx, rx) = channel();
        let mut state = State::new();
        let mut input = serde_json::Map::new();
        input.insert("cmd".into(), serde_json::Value::String("ls src".into()));
        let tool_item = item(vec![ContentBlock::ToolUse {
            tool_name: "exec_command".into(),
            tool_id: "call_1".into(),
            tool_input: input,
        }]);
        handle_item("s1", None, &mut state, tool_item, &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.explored_batch, vec!["List src".to_string()]);

        let text_item = item(vec![ContentBlock::text("done")]);
        handle_item("s1", None, &mut state, text_item, &tx);

        let explored = rx.recv().unwrap();
        match explored.payload {
            EventPayload::ClaudeMessage(msg) => {
                assert_eq!(msg.content.len(), 1);
                assert!(matches!(&msg.content[0], ContentBlock::Text { text } if text.starts_with("**Explored**")));
            }
            _ => panic!("expected claude_message"),
        }
        let done = rx.recv().unwrap();
        assert!(matches!(done.payload, EventPayload::ClaudeMessage(_)));
    }

    #[test]
    fn duplicate_thinking_within_two_seconds_is_dropped() {
        let (tx, rx) = channel();
        let mut state = State::new();
        let now = Utc::now();
        let mut first = item(vec![ContentBlock::thinking("pondering")]);
        first.timestamp = now;
        handle_item("s1", None, &mut state, first, &tx);
        assert!(rx.try_recv().is_ok());

        let mut second = item(vec![ContentBlock::thinking("pondering")]);
        second.timestamp = now + chrono::Duration::milliseconds(500);
        handle_item("s1", None, &mut state, second, &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn distinct_thinking_text_is_not_deduplicated() {
        let (tx, rx) = channel();
        let mut state = State::new();
        let now = Utc::now();
        let mut first = item(vec![ContentBlock::thinking("pondering")]);
        first.timestamp = now;
        handle_item("s1", None, &mut state, first, &tx);
        assert!(rx.try_recv().is_ok());

        let mut second = item(vec![ContentBlock::thinking("reconsidering")]);
        second.timestamp = now + chrono::Duration::milliseconds(500);
        handle_item("s1", None, &mut state, second, &tx);
        assert!(rx.try_recv().is_ok());
    }
}
