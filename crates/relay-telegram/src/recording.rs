//! In-process gateway that records outbound calls instead of sending them.
//!
//! Backs the `--dry-run` server mode and the relay tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use relay_models::ChatId;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::gateway::{MessagingGateway, SendOptions};

/// A message captured by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: ChatId,
    pub text: String,
    pub options: SendOptions,
}

/// A callback acknowledgement captured by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub callback_id: String,
    pub text: Option<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<SentMessage>,
    answers: Vec<CallbackAnswer>,
    failing: HashSet<ChatId>,
}

/// Gateway that keeps every call in memory.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    inner: Mutex<Recorded>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every send to `chat` fail.
    pub fn fail_for(&self, chat: ChatId) {
        self.lock().failing.insert(chat);
    }

    /// All messages sent so far, in order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().messages.clone()
    }

    /// Messages sent to one chat, in order.
    pub fn messages_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.recipient == chat)
            .cloned()
            .collect()
    }

    /// All callback acknowledgements so far.
    pub fn callback_answers(&self) -> Vec<CallbackAnswer> {
        self.lock().answers.clone()
    }

    /// Forget everything recorded so far. Failure settings are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.messages.clear();
        inner.answers.clear();
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_message(&self, recipient: ChatId, text: &str, options: &SendOptions) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing.contains(&recipient) {
            return Err(RelayError::Gateway(format!("chat {} unreachable", recipient)));
        }
        info!(chat_id = %recipient, text = %text, "Recorded outbound message");
        inner.messages.push(SentMessage {
            recipient,
            text: text.to_string(),
            options: options.clone(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.lock().answers.push(CallbackAnswer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_filters() {
        let gateway = RecordingGateway::new();
        gateway.send_message(ChatId(1), "a", &SendOptions::plain()).await.unwrap();
        gateway.send_message(ChatId(2), "b", &SendOptions::html()).await.unwrap();
        gateway.answer_callback("cb", Some("ok")).await.unwrap();

        assert_eq!(gateway.messages().len(), 2);
        assert_eq!(gateway.messages_to(ChatId(2))[0].text, "b");
        assert_eq!(gateway.callback_answers()[0].text.as_deref(), Some("ok"));

        gateway.clear();
        assert!(gateway.messages().is_empty());
        assert!(gateway.callback_answers().is_empty());
    }

    #[tokio::test]
    async fn test_failing_recipient() {
        let gateway = RecordingGateway::new();
        gateway.fail_for(ChatId(9));
        assert!(gateway.send_message(ChatId(9), "x", &SendOptions::plain()).await.is_err());
        assert!(gateway.messages().is_empty());
    }
}
