// src/services/chat.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use log::{debug, info};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::models::{ConversationTurn, Role};
use crate::services::google_oauth::{ServiceAccountAuth, CLOUD_PLATFORM_SCOPE};

const SYSTEM_PROMPT: &str = "You are a warm, attentive personal AI assistant. \
Keep answers short and conversational.";

#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(
        &self,
        message: &str,
        user_id: &str,
        history: &[ConversationTurn],
    ) -> Result<String>;
}

/// Canned replies used when no hosted model is configured.
pub struct MockResponder;

impl MockResponder {
    pub fn templates(message: &str) -> [String; 5] {
        [
            format!("I understand you're saying '{message}'. How can I help you further?"),
            format!("That's interesting about '{message}'. Let me think about that."),
            format!("I see you mentioned '{message}'. Would you like to know more about this topic?"),
            format!("Regarding '{message}', I have some thoughts that might help you."),
            format!("I've processed your message about '{message}'. Here's what I think..."),
        ]
    }

    pub fn reply(message: &str) -> String {
        let templates = Self::templates(message);
        let chosen = templates
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();
        format!("[{}] {}", Local::now().format("%H:%M:%S"), chosen)
    }
}

#[async_trait]
impl ChatResponder for MockResponder {
    async fn respond(
        &self,
        message: &str,
        user_id: &str,
        _history: &[ConversationTurn],
    ) -> Result<String> {
        debug!("Mock reply for {}", user_id);
        Ok(Self::reply(message))
    }
}

/// Forwards the conversation to a Gemini model on Vertex AI.
pub struct VertexResponder {
    client: Client,
    auth: ServiceAccountAuth,
    endpoint: String,
}

impl VertexResponder {
    pub fn from_config(config: &Config) -> Result<Self> {
        let project = config
            .project_id
            .as_deref()
            .ok_or_else(|| anyhow!("PROJECT_ID is required for the hosted model"))?;
        let key_path = config
            .credentials_path
            .as_deref()
            .ok_or_else(|| {
                anyhow!("GOOGLE_APPLICATION_CREDENTIALS is required for the hosted model")
            })?;

        let auth = ServiceAccountAuth::from_file(key_path, CLOUD_PLATFORM_SCOPE)?;
        let endpoint = format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
            loc = config.location,
            project = project,
            model = config.model,
        );
        info!("Hosted model endpoint: {}", endpoint);

        Ok(Self {
            client: Client::new(),
            auth,
            endpoint,
        })
    }
}

pub fn build_contents(message: &str, history: &[ConversationTurn]) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.content }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));
    serde_json::Value::Array(contents)
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| anyhow!("model returned no candidates"))?;
    Ok(content.parts.into_iter().map(|p| p.text).collect())
}

#[async_trait]
impl ChatResponder for VertexResponder {
    async fn respond(
        &self,
        message: &str,
        user_id: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let token = self.auth.access_token().await?;
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": build_contents(message, history),
        });

        debug!("Sending {} prior turns for {}", history.len(), user_id);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("calling hosted model")?
            .error_for_status()
            .context("hosted model returned an error status")?
            .json::<GenerateResponse>()
            .await
            .context("decoding hosted model response")?;

        extract_text(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_reply_always_quotes_the_input() {
        let inputs = [
            "",
            "hello",
            "What's the weather in 東京?",
            "multi\nline input",
            "   padded   ",
        ];
        for input in inputs {
            let reply = MockResponder
                .respond(input, "default_user", &[])
                .await
                .unwrap();
            assert!(!reply.is_empty());
            assert!(reply.contains(input), "{reply:?} lacks {input:?}");
        }
    }

    #[test]
    fn mock_reply_is_prefixed_with_clock_time() {
        let reply = MockResponder::reply("ping");
        let prefix = &reply[..11];
        assert!(prefix.starts_with('[') && prefix.ends_with("] "));
        assert_eq!(prefix.matches(':').count(), 2);
        assert!(MockResponder::templates("ping")
            .iter()
            .any(|t| reply.ends_with(t.as_str())));
    }

    #[test]
    fn contents_map_roles_and_end_with_the_new_message() {
        let history = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello!"),
        ];
        let contents = build_contents("how are you?", &history);
        let roles: Vec<&str> = contents
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(contents[2]["parts"][0]["text"], "how are you?");
    }

    #[test]
    fn response_parts_are_joined_verbatim() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Hello there.");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(empty).is_err());
    }
}
