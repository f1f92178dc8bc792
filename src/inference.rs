use crate::config::Config;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Text-completion backend that names a language code.
pub trait LanguageNamer: Send + Sync {
    /// Returns the trimmed completion for `code`. Any failure is an error;
    /// callers decide how to degrade.
    fn name_for<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the single user-role prompt for a language code
pub fn build_prompt(language_code: &str) -> String {
    format!(
        r#"Your task is to identify and return the language name in English for the given language code: "{}".

Rules:
- Return the language name in English (e.g., "English (United States)", "Chinese (Simplified, China)", "Japanese").
- Do not include any additional text or explanation.
- Use widely accepted standard language names.
- If the code is invalid or unknown, return "Unknown".

Example responses:
- For "en": English
- For "en-US": English (United States)
- For "zh": Chinese
- For "zh-CN": Chinese (Simplified, China)
- For "ja": Japanese"#,
        language_code
    )
}

/// OpenAI-compatible chat completion client
#[derive(Debug, Clone)]
pub struct OpenAiNamer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiNamer {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    fn build_request(&self, language_code: &str) -> ChatRequest {
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(language_code),
            }],
            // Reasoning models spend tokens before answering
            max_completion_tokens: if is_reasoning { 2000 } else { 50 },
            temperature: if is_reasoning { None } else { Some(0.0) },
        }
    }

    async fn complete(&self, language_code: &str) -> Result<String> {
        let request = self.build_request(language_code);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("OpenAI API error ({}): {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let name = chat_response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .context("OpenAI response contained no choices")?;

        if name.is_empty() {
            anyhow::bail!("OpenAI returned an empty language name");
        }

        Ok(name)
    }
}

impl LanguageNamer for OpenAiNamer {
    fn name_for<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<String>> {
        self.complete(code).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    // ==================== Helper Functions ====================

    fn create_test_config(api_url: &str) -> Config {
        Config {
            openai_api_key: "test-openai-key".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: api_url.to_string(),
            database_url: None,
            port: 8080,
            cache_max_age_secs: 86400,
            inference_timeout_secs: 5,
            store_timeout_secs: 5,
        }
    }

    fn create_openai_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1705312200,
            "model": "gpt-4o-mini",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": content
                    },
                    "finish_reason": "stop"
                }
            ]
        })
    }

    async fn namer_for(server: &MockServer) -> OpenAiNamer {
        let config = create_test_config(&format!("{}/v1/chat/completions", server.uri()));
        OpenAiNamer::new(reqwest::Client::new(), &config)
    }

    // ==================== Prompt Tests ====================

    #[test]
    fn test_prompt_contains_code_and_rules() {
        let prompt = build_prompt("pt-BR");

        assert!(prompt.contains(r#"language code: "pt-BR""#));
        assert!(prompt.contains("Do not include any additional text"));
        assert!(prompt.contains("widely accepted standard language names"));
        assert!(prompt.contains(r#"return "Unknown""#));
    }

    #[test]
    fn test_prompt_contains_examples() {
        let prompt = build_prompt("xx");

        assert!(prompt.contains(r#"For "en": English"#));
        assert!(prompt.contains(r#"For "en-US": English (United States)"#));
        assert!(prompt.contains(r#"For "zh": Chinese"#));
        assert!(prompt.contains(r#"For "zh-CN": Chinese (Simplified, China)"#));
        assert!(prompt.contains(r#"For "ja": Japanese"#));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("fr"), build_prompt("fr"));
    }

    // ==================== Request Tests ====================

    #[test]
    fn test_request_is_single_user_message() {
        let namer = OpenAiNamer::new(reqwest::Client::new(), &create_test_config("http://x"));
        let request = namer.build_request("de");

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[0].content, build_prompt("de"));
        assert_eq!(request.temperature, Some(0.0));
    }

    #[test]
    fn test_reasoning_model_omits_temperature() {
        let mut config = create_test_config("http://x");
        config.openai_model = "o3-mini".to_string();
        let namer = OpenAiNamer::new(reqwest::Client::new(), &config);

        let json = serde_json::to_string(&namer.build_request("de")).expect("Should serialize");
        assert!(!json.contains("temperature"));
        assert!(json.contains("o3-mini"));
    }

    #[test]
    fn test_is_reasoning_model() {
        assert!(is_reasoning_model("gpt-5-mini"));
        assert!(is_reasoning_model("o1-preview"));
        assert!(is_reasoning_model("o4-mini"));
        assert!(!is_reasoning_model("gpt-4o-mini"));
    }

    // ==================== name_for Tests ====================

    #[tokio::test]
    async fn test_name_for_success_trims_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-openai-key"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_openai_response("  German\n")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let namer = namer_for(&mock_server).await;
        let name = namer.name_for("de").await.expect("Should resolve");

        assert_eq!(name, "German");
    }

    #[tokio::test]
    async fn test_name_for_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let namer = namer_for(&mock_server).await;
        let err = namer.name_for("de").await.unwrap_err();

        assert!(err.to_string().contains("OpenAI API error"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_name_for_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let namer = namer_for(&mock_server).await;
        let err = namer.name_for("de").await.unwrap_err();

        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_name_for_blank_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response("   ")))
            .mount(&mock_server)
            .await;

        let namer = namer_for(&mock_server).await;
        assert!(namer.name_for("de").await.is_err());
    }

    #[tokio::test]
    async fn test_name_for_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let namer = namer_for(&mock_server).await;
        let err = namer.name_for("de").await.unwrap_err();

        assert!(err.to_string().contains("Failed to parse OpenAI response"));
    }

    // ==================== ChatResponse Deserialization Tests ====================

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": "Chinese (Simplified, China)"
                    }
                }
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "Chinese (Simplified, China)");
    }
}
