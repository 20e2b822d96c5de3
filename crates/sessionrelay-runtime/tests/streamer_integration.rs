use std::io::Write;
use std::time::{Duration, Instant};

use sessionrelay_types::EventPayload;

fn line(role: &str, text: &str) -> String {
    format!(
        r#"{{"timestamp":"2026-01-01T00:00:00Z","type":"response_item","payload":{{"type":"message","role":"{role}","content":"{text}"}}}}"#
    )
}

fn wait_for<T>(receiver: &std::sync::mpsc::Receiver<T>, timeout: Duration) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(value) = receiver.try_recv() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn attach_streams_lines_appended_after_attach() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout-test.jsonl");
    std::fs::write(&path, line("user", "hi before attach") + "\n").unwrap();

    let streamer = sessionrelay_runtime::SessionStreamer::attach("sess1".into(), path.clone(), None).unwrap();

    // Content written before attach is not replayed; only growth is streamed.
    assert!(wait_for(streamer.receiver(), Duration::from_millis(300)).is_none());

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{}", line("assistant", "hello back")).unwrap();
    drop(file);

    let event = wait_for(streamer.receiver(), Duration::from_secs(3)).expect("expected a claude_message event");
    match event.payload {
        EventPayload::ClaudeMessage(item) => {
            assert_eq!(item.content.len(), 1);
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert_eq!(event.session_id, Some("sess1".to_string()));
}

#[test]
fn read_complete_event_fires_after_quiescence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout-test2.jsonl");
    std::fs::write(&path, "").unwrap();

    let streamer = sessionrelay_runtime::SessionStreamer::attach("sess2".into(), path.clone(), Some("codex".into())).unwrap();

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{}", line("user", "hi")).unwrap();
    drop(file);

    let message = wait_for(streamer.receiver(), Duration::from_secs(2)).expect("expected claude_message");
    assert!(matches!(message.payload, EventPayload::ClaudeMessage(_)));

    let complete = wait_for(streamer.receiver(), Duration::from_secs(4)).expect("expected stream_read_complete");
    match complete.payload {
        EventPayload::StreamReadComplete(payload) => {
            assert_eq!(payload.message_count, 1);
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert_eq!(complete.agent_type, Some("codex".to_string()));
}
