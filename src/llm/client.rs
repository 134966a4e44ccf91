use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{ClassifierResponse, Transcript};

use super::prompts::{CLASSIFIER_SYSTEM_PROMPT, build_classifier_prompt};

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl AnthropicConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;

        Ok(Self {
            api_key,
            model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
        })
    }
}

/// Anthropic API client used as the section classifier.
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Classify a transcript into coarse section labels.
    ///
    /// The response is forced through a `submit_sections` tool so the
    /// classifier contract comes back as structured data rather than free
    /// text. Category names are NOT validated here - that happens at the
    /// model boundary so unrecognized categories are reported, not lost.
    pub async fn classify(&self, transcript: &Transcript) -> Result<ClassifierResponse> {
        let user = build_classifier_prompt(transcript);
        info!(
            "classifying transcript ({} spans) with {}",
            transcript.spans.len(),
            self.config.model
        );

        let tool = Tool {
            name: "submit_sections".to_string(),
            description: "Submit the identified sections with timestamps and summaries"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sections": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {
                                    "type": "string",
                                    "enum": [
                                        "Salam Time/Ice Breaker",
                                        "Discussion Topic",
                                        "Quran Recitation",
                                        "Arabic",
                                        "Worship"
                                    ]
                                },
                                "start_time": {
                                    "type": "string",
                                    "description": "Section start as MM:SS or HH:MM:SS"
                                },
                                "end_time": {
                                    "type": "string",
                                    "description": "Section end as MM:SS or HH:MM:SS"
                                },
                                "summary": {
                                    "type": "string",
                                    "description": "One or two sentences on what happens here"
                                }
                            },
                            "required": ["type", "start_time", "end_time", "summary"]
                        }
                    },
                    "overall_summary": {
                        "type": "string",
                        "description": "1-2 sentence summary of the entire class"
                    },
                    "detected_order": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Category names in first-appearance order"
                    }
                },
                "required": ["sections", "overall_summary", "detected_order"]
            }),
        };

        let request = AnthropicToolRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user,
            }],
            tools: vec![tool],
            tool_choice: Some(ToolChoice {
                choice_type: "tool".to_string(),
                name: "submit_sections".to_string(),
            }),
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error: {} - {}", status, body);
        }

        let response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        // Find the tool_use content block
        for content in &response.content {
            if content.content_type == "tool_use"
                && content.name.as_deref() == Some("submit_sections")
            {
                if let Some(input) = &content.input {
                    let sections: ClassifierResponse = serde_json::from_value(input.clone())
                        .context("Failed to parse tool input as section labels")?;
                    return Ok(sections);
                }
            }
        }

        anyhow::bail!("No tool_use response found")
    }
}

#[derive(Debug, Serialize)]
struct AnthropicToolRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}
