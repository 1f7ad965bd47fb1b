//! Classification of raw webhook payloads into canonical events.
//!
//! Every authenticated delivery is classified exactly once, at
//! ingestion. The resulting [`Event`] carries the decided kind and a
//! short summary; downstream consumers (the dispatcher, the history
//! endpoint) trust the stored values and never re-derive them.
//!
//! Classification never rejects a syntactically valid payload: unknown
//! event types map to [`EventKind::Other`], and missing payload fields
//! yield empty-string placeholders rather than errors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length of a derived summary, in characters.
///
/// Oversized payload text is truncated, never rejected.
pub const MAX_SUMMARY_LEN: usize = 200;

/// Monotonic identifier assigned by the event store at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical category a webhook delivery is classified into.
///
/// This is a closed enum: anything the classifier does not recognize
/// becomes `Other` rather than an error, so the pipeline never drops
/// an authenticated delivery merely for being unfamiliar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Commits pushed to a branch.
    Push,
    /// Pull request lifecycle (opened, closed, synchronized, ...).
    PullRequest,
    /// A GitHub Actions workflow run changed state.
    WorkflowRun,
    /// An individual check run changed state.
    CheckRun,
    /// Issue lifecycle (opened, closed, labeled, ...).
    Issues,
    /// Any event type the classifier does not recognize.
    Other,
}

impl EventKind {
    /// Maps an `X-GitHub-Event` header tag to a kind.
    pub fn from_header(tag: &str) -> EventKind {
        match tag {
            "push" => EventKind::Push,
            "pull_request" => EventKind::PullRequest,
            "workflow_run" => EventKind::WorkflowRun,
            "check_run" => EventKind::CheckRun,
            "issues" => EventKind::Issues,
            _ => EventKind::Other,
        }
    }

    /// Returns the snake_case tag for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::WorkflowRun => "workflow_run",
            EventKind::CheckRun => "check_run",
            EventKind::Issues => "issues",
            EventKind::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified webhook event.
///
/// Immutable once appended to the store; destroyed only by eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned monotonic id.
    pub id: EventId,

    /// Ingestion timestamp.
    pub received_at: DateTime<Utc>,

    /// Canonical kind, decided once at classification.
    pub kind: EventKind,

    /// Repository full name ("owner/repo"), or empty if absent.
    pub repository: String,

    /// Login of the user that triggered the event, or empty if absent.
    pub sender: String,

    /// The raw payload as delivered, kept opaque.
    pub raw_payload: Value,

    /// Short human-readable summary, at most [`MAX_SUMMARY_LEN`] chars.
    pub summary: String,
}

/// Classifies a raw payload into an [`Event`].
///
/// Deterministic: the same header tag and payload always produce the
/// same `kind`, `repository`, `sender`, and `summary`. The `id` is a
/// placeholder until the store assigns the real one at append.
pub fn classify(event_type: &str, payload: &Value, received_at: DateTime<Utc>) -> Event {
    let kind = EventKind::from_header(event_type);
    let repository = string_at(payload, &["repository", "full_name"]);
    let sender = extract_sender(kind, payload);
    let summary = truncate(summarize(kind, event_type, payload, &repository, &sender));

    Event {
        id: EventId(0),
        received_at,
        kind,
        repository,
        sender,
        raw_payload: payload.clone(),
        summary,
    }
}

/// Extracts the acting user.
///
/// Push payloads name the actor under `pusher.name`; everything else
/// uses `sender.login`.
fn extract_sender(kind: EventKind, payload: &Value) -> String {
    let sender = string_at(payload, &["sender", "login"]);
    if sender.is_empty() && kind == EventKind::Push {
        return string_at(payload, &["pusher", "name"]);
    }
    sender
}

/// Builds the per-kind summary line.
fn summarize(
    kind: EventKind,
    event_type: &str,
    payload: &Value,
    repository: &str,
    sender: &str,
) -> String {
    let repo = or_unknown(repository);
    let who = or_unknown(sender);

    match kind {
        EventKind::Push => {
            let git_ref = or_unknown(&string_at(payload, &["ref"]));
            format!("push to {repo} by {who} on {git_ref}")
        }
        EventKind::PullRequest => {
            let action = or_unknown(&string_at(payload, &["action"]));
            let number = payload
                .pointer("/pull_request/number")
                .and_then(Value::as_u64);
            match number {
                Some(n) => format!("pull request #{n} {action} in {repo} by {who}"),
                None => format!("pull request {action} in {repo} by {who}"),
            }
        }
        EventKind::WorkflowRun => summarize_workflow_run(payload, &repo),
        EventKind::CheckRun => {
            let name = or_unknown(&string_at(payload, &["check_run", "name"]));
            let conclusion = string_at(payload, &["check_run", "conclusion"]);
            let status = if conclusion.is_empty() {
                string_at(payload, &["check_run", "status"])
            } else {
                conclusion
            };
            format!("check run {name} {} in {repo}", or_unknown(&status))
        }
        EventKind::Issues => {
            let action = or_unknown(&string_at(payload, &["action"]));
            let number = payload.pointer("/issue/number").and_then(Value::as_u64);
            match number {
                Some(n) => format!("issue #{n} {action} in {repo} by {who}"),
                None => format!("issue {action} in {repo} by {who}"),
            }
        }
        EventKind::Other => format!("{event_type} event in {repo}"),
    }
}

/// Workflow runs get CI-oriented wording so chat alerts read well.
fn summarize_workflow_run(payload: &Value, repo: &str) -> String {
    let name = or_unknown(&string_at(payload, &["workflow_run", "name"]));
    let branch = or_unknown(&string_at(payload, &["workflow_run", "head_branch"]));
    let run_number = payload
        .pointer("/workflow_run/run_number")
        .and_then(Value::as_u64);
    let run = match run_number {
        Some(n) => format!("run #{n}"),
        None => "run".to_string(),
    };

    match string_at(payload, &["workflow_run", "conclusion"]).as_str() {
        "failure" => format!("CI failure: workflow {name} {run} on {branch} in {repo}"),
        "success" => format!("workflow {name} {run} succeeded on {branch} in {repo}"),
        "" => {
            let status = or_unknown(&string_at(payload, &["workflow_run", "status"]));
            format!("workflow {name} {run} {status} on {branch} in {repo}")
        }
        other => format!("workflow {name} {run} concluded {other} on {branch} in {repo}"),
    }
}

/// Looks up a nested string field, defaulting to empty.
fn string_at(payload: &Value, path: &[&str]) -> String {
    let mut current = payload;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    current.as_str().unwrap_or_default().to_string()
}

/// Owned so callers can feed it `string_at` temporaries directly.
fn or_unknown(s: &str) -> String {
    if s.is_empty() {
        "unknown".to_string()
    } else {
        s.to_string()
    }
}

/// Truncates to [`MAX_SUMMARY_LEN`] characters on a char boundary.
fn truncate(summary: String) -> String {
    if summary.chars().count() <= MAX_SUMMARY_LEN {
        summary
    } else {
        summary.chars().take(MAX_SUMMARY_LEN).collect()
    }
}
