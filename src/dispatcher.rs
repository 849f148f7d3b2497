//! Per-message routing: mention gating, canned replies, model fallback.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::classify;
use crate::inference::{self, Inference};

pub const CONNECTION_FALLBACK_REPLY: &str =
    "I'm having trouble connecting to my AI brain. Let me respond simply: I'm here to help! 🤖";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatType::Private => "private",
            ChatType::Group => "group",
            ChatType::Supergroup => "supergroup",
            ChatType::Channel => "channel",
        };
        f.write_str(s)
    }
}

/// A text message as handed over by the chat layer.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub chat_type: ChatType,
    pub text: String,
}

pub struct MessageDispatcher<B> {
    /// Bot mention including the leading `@`, e.g. `@noob_raka_bot`.
    handle: String,
    backend: Arc<B>,
}

impl<B: Inference + 'static> MessageDispatcher<B> {
    pub fn new(handle: impl Into<String>, backend: Arc<B>) -> Self {
        Self {
            handle: handle.into(),
            backend,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Compute the reply for one message.
    ///
    /// `None` means the message is not addressed to the bot and nothing should
    /// be sent. In a basic group that is any text without the bot handle.
    pub async fn dispatch(&self, msg: &IncomingMessage) -> Option<String> {
        info!("User ({}) in {}: {}", msg.chat_id, msg.chat_type, msg.text);

        let text = match msg.chat_type {
            ChatType::Group => {
                if !msg.text.contains(&self.handle) {
                    return None;
                }
                msg.text.replacen(&self.handle, "", 1).trim().to_string()
            }
            _ => msg.text.clone(),
        };

        let response = self.respond(text).await;
        info!("Bot ({}): {}", self.handle, response);
        Some(response)
    }

    async fn respond(&self, text: String) -> String {
        if let Some(canned) = classify(&text).canned_reply() {
            return canned.to_string();
        }

        // Run on its own task so a panic inside the backend stays contained.
        let backend = self.backend.clone();
        let task = tokio::spawn(async move { inference::reply(backend.as_ref(), &text).await });

        match task.await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Inference task for {} failed: {e}", self.backend.name());
                CONNECTION_FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{GOODBYE_REPLY, GREETING_REPLY};
    use crate::inference::InferenceError;
    use std::sync::Mutex;

    const HANDLE: &str = "@noob_raka_bot";

    /// Records prompts and answers with a fixed outcome.
    struct Scripted {
        outcome: Result<String, InferenceError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn err(e: InferenceError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(e),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl Inference for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.outcome.clone()
        }
    }

    struct Panicking;

    impl Inference for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
            panic!("backend exploded");
        }
    }

    fn msg(chat_type: ChatType, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: 42,
            chat_type,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_group_without_mention_is_ignored() {
        let backend = Scripted::ok("unused");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        let reply = dispatcher.dispatch(&msg(ChatType::Group, "what is rust?")).await;
        assert_eq!(reply, None);
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_group_mention_greeting() {
        let dispatcher = MessageDispatcher::new(HANDLE, Scripted::ok("unused"));
        let reply = dispatcher.dispatch(&msg(ChatType::Group, "@noob_raka_bot hello")).await;
        assert_eq!(reply.as_deref(), Some(GREETING_REPLY));
    }

    #[tokio::test]
    async fn test_group_mention_is_stripped_before_inference() {
        let backend = Scripted::ok("Rust is a language.");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        let reply = dispatcher
            .dispatch(&msg(ChatType::Group, "  @noob_raka_bot what is rust?  "))
            .await;
        assert_eq!(reply.as_deref(), Some("Rust is a language."));
        assert_eq!(backend.prompts(), vec!["what is rust?".to_string()]);
    }

    #[tokio::test]
    async fn test_only_first_mention_is_stripped() {
        let backend = Scripted::ok("ok");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        dispatcher
            .dispatch(&msg(ChatType::Group, "@noob_raka_bot ping @noob_raka_bot"))
            .await;
        assert_eq!(backend.prompts(), vec!["ping @noob_raka_bot".to_string()]);
    }

    #[tokio::test]
    async fn test_mention_only_gives_empty_prompt() {
        let backend = Scripted::ok("huh?");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        let reply = dispatcher.dispatch(&msg(ChatType::Group, "@noob_raka_bot")).await;
        assert_eq!(reply.as_deref(), Some("huh?"));
        assert_eq!(backend.prompts(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_private_chat_always_processed() {
        let backend = Scripted::ok("42");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        let reply = dispatcher
            .dispatch(&msg(ChatType::Private, "@noob_raka_bot meaning of life"))
            .await;
        assert_eq!(reply.as_deref(), Some("42"));
        // Handle is left in place outside basic groups.
        assert_eq!(backend.prompts(), vec!["@noob_raka_bot meaning of life".to_string()]);
    }

    #[tokio::test]
    async fn test_supergroup_not_mention_gated() {
        let dispatcher = MessageDispatcher::new(HANDLE, Scripted::ok("unused"));
        let reply = dispatcher.dispatch(&msg(ChatType::Supergroup, "goodbye all")).await;
        assert_eq!(reply.as_deref(), Some(GOODBYE_REPLY));
    }

    #[tokio::test]
    async fn test_canned_reply_skips_backend() {
        let backend = Scripted::ok("unused");
        let dispatcher = MessageDispatcher::new(HANDLE, backend.clone());

        assert_eq!(
            dispatcher.dispatch(&msg(ChatType::Private, "cya")).await.as_deref(),
            Some(GOODBYE_REPLY)
        );
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_mapped_to_text() {
        let dispatcher =
            MessageDispatcher::new(HANDLE, Scripted::err(InferenceError::Upstream(429)));
        let reply = dispatcher.dispatch(&msg(ChatType::Private, "tell me a joke")).await;
        assert_eq!(reply.as_deref(), Some(inference::OVERWHELMED_REPLY));
    }

    #[tokio::test]
    async fn test_panicking_backend_falls_back() {
        let dispatcher = MessageDispatcher::new(HANDLE, Arc::new(Panicking));
        let reply = dispatcher.dispatch(&msg(ChatType::Private, "tell me a joke")).await;
        assert_eq!(reply.as_deref(), Some(CONNECTION_FALLBACK_REPLY));
    }

    #[test]
    fn test_chat_type_display() {
        assert_eq!(ChatType::Group.to_string(), "group");
        assert_eq!(ChatType::Private.to_string(), "private");
    }
}
