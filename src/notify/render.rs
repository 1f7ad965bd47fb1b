//! Per-channel message rendering.
//!
//! Decides which events notify which channels, and formats the
//! channel-specific message from the stored [`Event`]. Pushes announce
//! to chat; workflow runs alert chat on any terminal conclusion, and
//! additionally email on failure. Rendering trusts the event's stored
//! `kind` and `summary` and never re-classifies.

use serde_json::Value;

use crate::notify::ChannelKind;
use crate::webhooks::{Event, EventKind};

/// A message rendered for one channel.
///
/// Chat uses only the body; email uses subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Renders `event` for `channel`, or `None` when this event kind does
/// not notify that channel.
pub fn render(event: &Event, channel: ChannelKind) -> Option<RenderedMessage> {
    match (event.kind, channel) {
        (EventKind::Push, ChannelKind::Chat) => Some(RenderedMessage {
            subject: format!("Push to {}", repo(event)),
            body: event.summary.clone(),
        }),
        (EventKind::WorkflowRun, ChannelKind::Chat) => match conclusion(event) {
            "failure" => Some(workflow_message("CI Failure Alert", event)),
            "success" => Some(workflow_message("Deployment Successful", event)),
            _ => None,
        },
        (EventKind::WorkflowRun, ChannelKind::Email) => match conclusion(event) {
            "failure" => Some(workflow_message("CI Failure Alert", event)),
            _ => None,
        },
        _ => None,
    }
}

fn workflow_message(headline: &str, event: &Event) -> RenderedMessage {
    let run = &event.raw_payload["workflow_run"];
    let name = field(run, "name");
    let branch = field(run, "head_branch");
    let run_number = run
        .get("run_number")
        .and_then(Value::as_u64)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let url = match run.get("html_url").and_then(Value::as_str) {
        Some(url) => url.to_string(),
        None => "#".to_string(),
    };

    RenderedMessage {
        subject: format!("{headline}: {name} in {}", repo(event)),
        body: format!(
            "{headline} - Workflow: {name}, Repository: {}, Branch: {branch}, \
             Run Number: {run_number}, View Details: {url}",
            repo(event)
        ),
    }
}

fn repo(event: &Event) -> &str {
    if event.repository.is_empty() {
        "unknown"
    } else {
        &event.repository
    }
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    match value.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => "unknown",
    }
}

fn conclusion(event: &Event) -> &str {
    event
        .raw_payload
        .pointer("/workflow_run/conclusion")
        .and_then(Value::as_str)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::webhooks::classify;

    fn workflow_event(conclusion: &str) -> Event {
        let payload = json!({
            "repository": { "full_name": "octocat/hello-world" },
            "sender": { "login": "octocat" },
            "workflow_run": {
                "name": "CI",
                "head_branch": "main",
                "run_number": 42,
                "conclusion": conclusion,
                "html_url": "https://github.com/octocat/hello-world/actions/runs/1"
            }
        });
        classify("workflow_run", &payload, Utc::now())
    }

    #[test]
    fn push_notifies_chat_only() {
        let payload = json!({
            "ref": "refs/heads/main",
            "repository": { "full_name": "octocat/hello-world" },
            "pusher": { "name": "octocat" }
        });
        let event = classify("push", &payload, Utc::now());

        let chat = render(&event, ChannelKind::Chat).unwrap();
        assert_eq!(chat.body, event.summary);

        assert!(render(&event, ChannelKind::Email).is_none());
    }

    #[test]
    fn workflow_failure_notifies_both_channels() {
        let event = workflow_event("failure");

        let chat = render(&event, ChannelKind::Chat).unwrap();
        assert!(chat.body.starts_with("CI Failure Alert"));
        assert!(chat.body.contains("Workflow: CI"));
        assert!(chat.body.contains("Branch: main"));
        assert!(chat.body.contains("Run Number: 42"));

        let email = render(&event, ChannelKind::Email).unwrap();
        assert_eq!(email.subject, "CI Failure Alert: CI in octocat/hello-world");
    }

    #[test]
    fn workflow_success_notifies_chat_not_email() {
        let event = workflow_event("success");

        let chat = render(&event, ChannelKind::Chat).unwrap();
        assert!(chat.body.starts_with("Deployment Successful"));

        assert!(render(&event, ChannelKind::Email).is_none());
    }

    #[test]
    fn pending_workflow_notifies_nobody() {
        let payload = json!({
            "repository": { "full_name": "octocat/hello-world" },
            "workflow_run": { "name": "CI", "status": "in_progress" }
        });
        let event = classify("workflow_run", &payload, Utc::now());

        assert!(render(&event, ChannelKind::Chat).is_none());
        assert!(render(&event, ChannelKind::Email).is_none());
    }

    #[test]
    fn quiet_kinds_render_nothing() {
        let event = classify("issues", &json!({}), Utc::now());
        assert!(render(&event, ChannelKind::Chat).is_none());

        let event = classify("deployment_review", &json!({}), Utc::now());
        assert!(render(&event, ChannelKind::Chat).is_none());
    }

    #[test]
    fn missing_workflow_fields_become_placeholders() {
        let payload = json!({
            "workflow_run": { "conclusion": "failure" }
        });
        let event = classify("workflow_run", &payload, Utc::now());

        let chat = render(&event, ChannelKind::Chat).unwrap();
        assert!(chat.body.contains("Workflow: unknown"));
        assert!(chat.body.contains("View Details: #"));
    }
}
