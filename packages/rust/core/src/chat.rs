//! One chat exchange: request building and placeholder reconciliation.

use botdemo_client::{ChatReply, ChatRequest};
use botdemo_shared::{BotDemoConfig, ChatMessage, MessageId, Result};
use tracing::warn;

/// Shown in place of an answer when the backend call fails.
pub const APOLOGY: &str =
    "I'm sorry, I encountered an error processing your request. Please try again.";

/// Build the request for one visitor message.
pub fn build_request(config: &BotDemoConfig, message: &str, context: String) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        system_prompt: config.system_prompt.clone(),
        additional_context: context,
    }
}

/// Settle the placeholder `id` with the outcome of its request.
///
/// Only the message with that id is touched. Returns `false` if no such
/// message exists (e.g. the conversation was reset meanwhile).
pub fn settle(messages: &mut [ChatMessage], id: MessageId, outcome: Result<ChatReply>) -> bool {
    let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
        return false;
    };

    match outcome {
        Ok(reply) => {
            message.content = reply.response;
            message.sources = reply.sources;
        }
        Err(e) => {
            warn!(error = %e, "chat request failed");
            message.content = APOLOGY.to_string();
            message.sources.clear();
        }
    }
    message.is_streaming = false;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdemo_shared::{ChatSource, DemoError, Role};

    #[test]
    fn settle_replaces_only_the_placeholder() {
        let placeholder = ChatMessage::placeholder();
        let id = placeholder.id;
        let mut messages = vec![ChatMessage::user("Hi"), placeholder, ChatMessage::assistant("older")];

        let reply = ChatReply {
            response: "Hello!".into(),
            sources: vec![ChatSource {
                title: "FAQ".into(),
                content: None,
                relevance: Some(0.5),
            }],
        };
        assert!(settle(&mut messages, id, Ok(reply)));

        assert_eq!(messages[1].id, id);
        assert_eq!(messages[1].content, "Hello!");
        assert_eq!(messages[1].sources.len(), 1);
        assert!(!messages[1].is_streaming);
        assert_eq!(messages[0].content, "Hi");
        assert_eq!(messages[2].content, "older");
    }

    #[test]
    fn settle_failure_uses_apology() {
        let placeholder = ChatMessage::placeholder();
        let id = placeholder.id;
        let mut messages = vec![placeholder];

        assert!(settle(&mut messages, id, Err(DemoError::http("/api/demo/chat", 502))));
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, APOLOGY);
        assert!(!messages[0].is_streaming);
    }

    #[test]
    fn settle_unknown_id_is_a_no_op() {
        let mut messages = vec![ChatMessage::assistant("welcome")];
        assert!(!settle(&mut messages, MessageId::new(), Ok(ChatReply::default())));
        assert_eq!(messages[0].content, "welcome");
    }
}
