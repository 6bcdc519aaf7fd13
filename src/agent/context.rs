//! Replaying a stored transcript as chat messages.
//!
//! Only tool results are stored, not the assistant turns that requested
//! them. Providers reject a tool message that does not follow a matching
//! `tool_calls` turn, so each run of consecutive tool messages is preceded
//! by a synthesized assistant message carrying the calls.

use crate::conversation::{Message, MessageRole};
use crate::llm::{ChatMessage, Role, ToolCall};

/// System prompt followed by the transcript (or its last `window` messages).
pub fn build_messages(
    system_prompt: &str,
    transcript: &[Message],
    window: Option<usize>,
) -> Vec<ChatMessage> {
    let mut start = window
        .map(|n| transcript.len().saturating_sub(n.max(1)))
        .unwrap_or(0);
    // A window opening on tool results widens back to the turn that led to them.
    while start > 0 && transcript[start].role == MessageRole::Tool {
        start -= 1;
    }
    let transcript = &transcript[start..];

    let mut messages = Vec::with_capacity(transcript.len() + 2);
    messages.push(ChatMessage::text(Role::System, system_prompt));

    let mut i = 0;
    while i < transcript.len() {
        let message = &transcript[i];
        if message.role != MessageRole::Tool {
            messages.push(ChatMessage::text(wire_role(message.role), &message.content));
            i += 1;
            continue;
        }

        let run_end = transcript[i..]
            .iter()
            .position(|m| m.role != MessageRole::Tool)
            .map_or(transcript.len(), |offset| i + offset);
        push_tool_run(&mut messages, &transcript[i..run_end]);
        i = run_end;
    }
    messages
}

fn push_tool_run(messages: &mut Vec<ChatMessage>, run: &[Message]) {
    let calls: Vec<ToolCall> = run
        .iter()
        .filter_map(|m| {
            let id = m.tool_call_id.as_ref()?;
            Some(ToolCall::new(
                id.clone(),
                m.tool_name.clone().unwrap_or_default(),
                m.tool_arguments.clone().unwrap_or_else(|| "{}".to_string()),
            ))
        })
        .collect();

    if !calls.is_empty() {
        messages.push(ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        });
    }

    for m in run {
        match &m.tool_call_id {
            Some(id) => messages.push(ChatMessage {
                role: Role::Tool,
                content: Some(m.content.clone()),
                tool_calls: None,
                tool_call_id: Some(id.clone()),
            }),
            // Without a call id the result can only travel as plain text.
            None => messages.push(ChatMessage::text(
                Role::User,
                format!(
                    "Tool result from {}: {}",
                    m.tool_name.as_deref().unwrap_or("tool"),
                    m.content
                ),
            )),
        }
    }
}

fn wire_role(role: MessageRole) -> Role {
    match role {
        MessageRole::System => Role::System,
        MessageRole::User => Role::User,
        MessageRole::Assistant => Role::Assistant,
        MessageRole::Tool => Role::Tool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<Message> {
        vec![
            Message::user("q1"),
            Message::tool("search_api", "call_a", r#"{"query":"a"}"#, "ra"),
            Message::tool("search_api", "call_b", r#"{"query":"b"}"#, "rb"),
            Message::assistant("answer"),
            Message::user("q2"),
        ]
    }

    #[test]
    fn system_prompt_leads_and_order_is_kept() {
        let messages = build_messages("sys", &transcript(), None);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Tool,
                Role::Assistant,
                Role::User
            ]
        );
        assert_eq!(messages[0].content.as_deref(), Some("sys"));
    }

    #[test]
    fn tool_run_is_preceded_by_its_calls() {
        let messages = build_messages("sys", &transcript(), None);
        let calls = messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(
            calls,
            &vec![
                ToolCall::new("call_a", "search_api", r#"{"query":"a"}"#),
                ToolCall::new("call_b", "search_api", r#"{"query":"b"}"#),
            ]
        );
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(messages[4].content.as_deref(), Some("rb"));
    }

    #[test]
    fn window_keeps_latest_messages() {
        let messages = build_messages("sys", &transcript(), Some(2));
        let contents: Vec<_> = messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(
            contents,
            vec![
                Some("sys".to_string()),
                Some("answer".to_string()),
                Some("q2".to_string())
            ]
        );
    }

    #[test]
    fn window_opening_on_tool_results_widens_to_their_question() {
        // The last 4 messages open on two tool results.
        let messages = build_messages("sys", &transcript(), Some(4));
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[1].content.as_deref(), Some("q1"));

        let pending = vec![
            Message::user("hello"),
            Message::tool("search_api", "call_a", r#"{"query":"a"}"#, "ra"),
            Message::tool("search_api", "call_b", r#"{"query":"b"}"#, "rb"),
        ];
        let messages = build_messages("sys", &pending, Some(2));
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]
        );
        assert_eq!(messages[1].content.as_deref(), Some("hello"));
    }

    #[test]
    fn zero_window_still_replays_latest_message() {
        let messages = build_messages("sys", &[Message::user("hello")], Some(0));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content.as_deref(), Some("hello"));
    }

    #[test]
    fn tool_message_without_call_id_becomes_text() {
        let mut legacy = Message::tool("search_api", "x", "{}", "old result");
        legacy.tool_call_id = None;
        let messages = build_messages("sys", &[Message::user("q"), legacy], None);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(
            messages[2].content.as_deref(),
            Some("Tool result from search_api: old result")
        );
    }
}
