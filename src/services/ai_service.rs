use crate::error::{Error, Result};
use crate::models::message::Message;
use crate::models::settings::AiSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    system: &'a str,
    max_tokens: i32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: i64,
    output_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: i64,
}

#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: String,
    api_url: String,
}

impl AIService {
    pub fn new(api_key: String, api_url: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            api_url,
        }
    }

    pub async fn complete(&self, history: &[ChatTurn], settings: &AiSettings) -> Result<Completion> {
        if self.api_key.is_empty() {
            return Err(Error::Config("AI API key is not configured".into()));
        }

        let payload = CompletionRequest {
            model: &settings.model,
            messages: history,
            system: &settings.system_prompt,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        let res = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("AI API Error {}: {}", status, text)));
        }

        let body: CompletionResponse = res.json().await?;
        Ok(Completion {
            text: collect_text(&body.content),
            total_tokens: body.usage.input_tokens + body.usage.output_tokens,
        })
    }
}

pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "[empty message]";

/// Turns stored chat history into provider turns. A message without text
/// still produces a turn, describing its attachments instead.
pub fn history_to_turns(messages: &[Message]) -> Vec<ChatTurn> {
    messages
        .iter()
        .map(|m| ChatTurn {
            role: if m.is_user { Role::User } else { Role::Assistant },
            content: vec![ContentBlock {
                kind: "text".into(),
                text: turn_text(m),
            }],
        })
        .collect()
}

fn turn_text(message: &Message) -> String {
    if !message.content.trim().is_empty() {
        return message.content.clone();
    }
    if message.attachments.is_empty() {
        return EMPTY_MESSAGE_PLACEHOLDER.to_string();
    }
    let names: Vec<&str> = message
        .attachments
        .iter()
        .map(|a| a.file_name.as_str())
        .collect();
    format!("[attached files: {}]", names.join(", "))
}

fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.kind == "text")
        .map(|b| b.text.as_str())
        .collect()
}

/// Rough token count: one and a half tokens per word, at least one.
pub fn estimate_tokens(text: &str) -> i64 {
    let words = text.split_whitespace().count() as i64;
    std::cmp::max(1, words * 3 / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Attachment;
    use chrono::Utc;

    #[test]
    fn token_estimate_matches_word_heuristic() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("hello"), 1);
        assert_eq!(estimate_tokens("hello world"), 3);
        assert_eq!(estimate_tokens("  one two   three \n four "), 6);
    }

    #[test]
    fn response_text_joins_only_text_blocks() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Hello, "},
                    {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                    {"type": "text", "text": "world"}
                ],
                "model": "m",
                "stop_reason": "end_turn",
                "stop_sequence": null,
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }"#,
        )
        .unwrap();
        assert_eq!(collect_text(&body.content), "Hello, world");
        assert_eq!(body.usage.input_tokens + body.usage.output_tokens, 15);
    }

    #[test]
    fn history_maps_roles_and_keeps_blank_messages() {
        let msg = |id: i64, content: &str, is_user: bool| Message {
            id,
            chat_id: 1,
            user_id: 1,
            content: content.into(),
            is_user,
            created_at: Utc::now(),
            attachments: vec![],
        };
        let turns = history_to_turns(&[msg(1, "hi", true), msg(2, "hello", false), msg(3, "  ", true)]);

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].role, Role::User);
        assert_eq!(turns[2].content[0].text, EMPTY_MESSAGE_PLACEHOLDER);

        let json = serde_json::to_value(&turns).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"][0]["type"], "text");
        assert_eq!(json[1]["content"][0]["text"], "hello");
    }

    #[test]
    fn files_only_message_is_the_last_turn() {
        let attachment = |name: &str| Attachment {
            id: 1,
            message_id: 2,
            file_name: name.into(),
            file_type: "image/jpeg".into(),
            file_path: format!("/uploads/1/1/{}", name),
            file_size: 10,
            created_at: Utc::now(),
        };
        let history = vec![
            Message {
                id: 1,
                chat_id: 1,
                user_id: 1,
                content: "earlier".into(),
                is_user: true,
                created_at: Utc::now(),
                attachments: vec![],
            },
            Message {
                id: 2,
                chat_id: 1,
                user_id: 1,
                content: String::new(),
                is_user: true,
                created_at: Utc::now(),
                attachments: vec![attachment("cat.jpg"), attachment("dog.jpg")],
            },
        ];

        let turns = history_to_turns(&history);
        assert_eq!(turns.len(), 2);
        let last = turns.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content[0].text, "[attached files: cat.jpg, dog.jpg]");
    }
}
