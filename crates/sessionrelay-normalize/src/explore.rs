//! Per-tool summaries for the "Explored" synthetic batch (§4.4). The
//! streamer (C4) decides *when* a run of tool calls qualifies as an
//! exploration burst; this module only decides what each tool call reads as.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static SED_RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(,\d+)?[a-zA-Z]$").unwrap());

const READ_TOOLS: [&str; 5] = ["cat", "sed", "nl", "tail", "head"];

/// Summarizes one accumulated tool call for the "Explored" block, or returns
/// an empty string if the tool renders as its own dedicated row instead.
pub fn summarize_tool_use(tool_name: &str, tool_input: &Map<String, Value>) -> String {
    match tool_name {
        "exec_command" => command_string(tool_input)
            .map(|cmd| summarize_command(&cmd))
            .unwrap_or_default(),
        "apply_patch" | "view_image" => String::new(),
        other => other.to_string(),
    }
}

/// Renders the accumulated, already-filtered summaries as the `**Explored**`
/// text block body (§4.4). Blank summaries are omitted.
pub fn format_explored_summary(summaries: &[String]) -> String {
    let mut out = String::from("**Explored**");
    for summary in summaries.iter().filter(|s| !s.is_empty()) {
        out.push_str("\n    ");
        out.push_str(summary);
    }
    out
}

fn command_string(tool_input: &Map<String, Value>) -> Option<String> {
    tool_input
        .get("command")
        .or_else(|| tool_input.get("cmd"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn summarize_command(cmd: &str) -> String {
    let argv = unwrap_shell_wrapper(tokenize(cmd));
    let Some(program) = argv.first() else {
        return String::new();
    };
    match program.as_str() {
        "find" => summarize_find(&argv[1..]),
        "ls" => summarize_ls(&argv[1..]),
        p if READ_TOOLS.contains(&p) => summarize_read(&argv),
        "rg" | "grep" => summarize_search(&argv[1..]),
        _ if cmd.contains('|') => summarize_pipeline(cmd),
        _ => String::new(),
    }
}

/// Collapses `bash -lc '<inner>'`-style wrappers down to the inner argv.
fn unwrap_shell_wrapper(argv: Vec<String>) -> Vec<String> {
    if argv.len() >= 3
        && matches!(argv[0].as_str(), "bash" | "sh" | "zsh")
        && argv[1].starts_with('-')
        && argv[1].contains('c')
    {
        tokenize(&argv[2])
    } else {
        argv
    }
}

fn summarize_pipeline(cmd: &str) -> String {
    for segment in cmd.split('|') {
        let argv = tokenize(segment);
        if let Some(program) = argv.first() {
            if READ_TOOLS.contains(&program.as_str()) {
                return summarize_read(&argv);
            }
        }
    }
    String::new()
}

fn summarize_find(args: &[String]) -> String {
    let mut root = ".".to_string();
    let mut root_set = false;
    let mut value: Option<String> = None;
    let mut has_filter = false;
    let mut iter = args.iter();
    while let Some(tok) = iter.next() {
        match tok.as_str() {
            "-name" | "-path" => {
                has_filter = true;
                if let Some(v) = iter.next() {
                    value = Some(v.clone());
                }
            }
            "-type" => {
                has_filter = true;
                iter.next();
            }
            _ if !tok.starts_with('-') && !root_set => {
                root = tok.clone();
                root_set = true;
            }
            _ => {}
        }
    }
    match value {
        Some(v) => format!("Search {v} in {root}"),
        None if has_filter => format!("Search in {root}"),
        None => format!("List {root}"),
    }
}

fn summarize_ls(args: &[String]) -> String {
    let target = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .cloned()
        .unwrap_or_else(|| ".".to_string());
    format!("List {target}")
}

fn summarize_read(argv: &[String]) -> String {
    let files: Vec<String> = argv[1..]
        .iter()
        .filter(|a| !a.starts_with('-') && !SED_RANGE.is_match(a))
        .map(|a| compact_basename(a))
        .collect();
    if files.is_empty() {
        return String::new();
    }
    format!("Read {}", files.join(", "))
}

fn summarize_search(args: &[String]) -> String {
    let mut non_flags = args.iter().filter(|a| !a.starts_with('-'));
    let Some(pattern) = non_flags.next() else {
        return String::new();
    };
    let target = non_flags.next().cloned().unwrap_or_else(|| ".".to_string());
    format!("Search \"{}\" in {target}", truncate_pattern(pattern))
}

fn truncate_pattern(pattern: &str) -> String {
    if pattern.chars().count() <= 72 {
        return pattern.to_string();
    }
    let head: String = pattern.chars().take(72).collect();
    format!("{head}...")
}

/// Compacts a path to its basename, preserving a `.cdev/...` relative prefix.
fn compact_basename(path: &str) -> String {
    const MARKER: &str = "/.cdev/";
    if let Some(idx) = path.find(MARKER) {
        return format!(".cdev/{}", &path[idx + MARKER.len()..]);
    }
    if path.starts_with(".cdev/") {
        return path.to_string();
    }
    std::path::Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes: Option<char> = None;
    for c in s.chars() {
        match in_quotes {
            Some(q) if c == q => in_quotes = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => in_quotes = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
