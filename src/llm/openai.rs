//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    AgentReply, ChatMessage, Completion, CompletionRequest, LlmClient, LlmError, ToolCall,
};
use crate::config::Config;

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.llm_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.llm_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.default_model.clone(),
            max_tokens: config.agent.max_tokens,
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": 0,
            "max_tokens": self.max_tokens,
            "n": 1,
            "response_format": reply_format(),
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                            "strict": t.strict,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        into_completion(parsed)
    }
}

/// JSON schema for the `{content, show_to_user}` reply contract.
fn reply_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "agent_reply",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "content": {"type": "string"},
                    "show_to_user": {"type": "boolean"}
                },
                "required": ["content", "show_to_user"],
                "additionalProperties": false
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    refusal: Option<String>,
}

fn into_completion(response: ChatCompletionResponse) -> Result<Completion, LlmError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

    let tool_calls = message.tool_calls.unwrap_or_default();
    let reply = match (message.content, message.refusal) {
        (Some(content), _) if !content.trim().is_empty() => Some(parse_reply(content)),
        (_, Some(refusal)) => Some(AgentReply {
            content: refusal,
            show_to_user: true,
        }),
        _ => None,
    };

    if reply.is_none() && tool_calls.is_empty() {
        return Err(LlmError::InvalidResponse(
            "completion carried neither content nor tool calls".to_string(),
        ));
    }
    Ok(Completion { reply, tool_calls })
}

/// Parse the structured reply, falling back to a visible plain-text answer.
fn parse_reply(content: String) -> AgentReply {
    match serde_json::from_str::<AgentReply>(&content) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Reply did not match the structured contract ({}), showing raw text", e);
            AgentReply {
                content,
                show_to_user: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolSchema};

    fn completion(body: Value) -> Result<Completion, LlmError> {
        into_completion(serde_json::from_value(body).expect("valid response"))
    }

    #[test]
    fn structured_reply_is_parsed() {
        let c = completion(json!({
            "choices": [{"message": {"content": "{\"content\":\"hi\",\"show_to_user\":false}"}}]
        }))
        .unwrap();
        assert_eq!(
            c.reply,
            Some(AgentReply {
                content: "hi".to_string(),
                show_to_user: false
            })
        );
        assert!(c.tool_calls.is_empty());
    }

    #[test]
    fn tool_calls_are_extracted_without_content() {
        let c = completion(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "search_api", "arguments": "{\"query\":\"people\"}"}
                }]
            }}]
        }))
        .unwrap();
        assert!(c.reply.is_none());
        assert_eq!(
            c.tool_calls,
            vec![ToolCall::new("call_1", "search_api", "{\"query\":\"people\"}")]
        );
    }

    #[test]
    fn plain_text_reply_is_shown() {
        let c = completion(json!({"choices": [{"message": {"content": "just text"}}]})).unwrap();
        let reply = c.reply.unwrap();
        assert_eq!(reply.content, "just text");
        assert!(reply.show_to_user);
    }

    #[test]
    fn refusal_is_shown() {
        let c = completion(json!({
            "choices": [{"message": {"content": null, "refusal": "no"}}]
        }))
        .unwrap();
        assert_eq!(c.reply.unwrap().content, "no");
    }

    #[test]
    fn empty_response_is_invalid() {
        assert!(matches!(
            completion(json!({"choices": []})),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            completion(json!({"choices": [{"message": {"content": ""}}]})),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn request_body_pins_sampling_and_tools() {
        let client = OpenAiClient::new(&Config::new("key".to_string())).unwrap();
        let body = client.request_body(&CompletionRequest {
            messages: vec![ChatMessage::text(Role::User, "hello")],
            tools: vec![ToolSchema {
                name: "search_api".to_string(),
                description: "Search docs".to_string(),
                parameters: json!({"type": "object"}),
                strict: true,
            }],
        });

        assert_eq!(body["temperature"], 0);
        assert_eq!(body["n"], 1);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0], json!({"role": "user", "content": "hello"}));
        assert_eq!(body["tools"][0]["function"]["name"], "search_api");
        assert_eq!(body["tools"][0]["function"]["strict"], true);
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn request_body_omits_empty_tool_list() {
        let client = OpenAiClient::new(&Config::new("key".to_string())).unwrap();
        let body = client.request_body(&CompletionRequest {
            messages: Vec::new(),
            tools: Vec::new(),
        });
        assert!(body.get("tools").is_none());
    }
}
