//! Gemini `generateContent` client with function calling.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{ChatMessage, ChatResponse, FunctionCall, LlmClient, LlmError, Role, ToolCall, ToolSchema};

const API_PATH: &str = "v1beta/models";

/// Client for the Google Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{API_PATH}/{model}:generateContent")
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, LlmError> {
        let payload = build_payload(messages, tools);

        info!(
            model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(self.model_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.without_url().to_string()))?;
        debug!("Received response from Gemini");

        parse_response(body)
    }
}

/// Translate the transcript into a `generateContent` request body.
fn build_payload(messages: &[ChatMessage], tools: Option<&[ToolSchema]>) -> Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    // Results answering one model turn share a single content.
    let mut function_responses = Vec::new();

    for message in messages {
        if message.role != Role::Tool {
            flush_function_responses(&mut contents, &mut function_responses);
        }

        match message.role {
            Role::System => {
                if let Some(text) = &message.content {
                    system_parts.push(json!({ "text": text }));
                }
            }
            Role::User => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": message.content.clone().unwrap_or_default() }],
                }));
            }
            Role::Assistant => {
                let mut parts = Vec::new();
                if let Some(text) = message.content.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(json!({ "text": text }));
                }
                for call in message.tool_calls.iter().flatten() {
                    let args: Value = serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| json!({}));
                    parts.push(json!({
                        "functionCall": { "name": call.function.name, "args": args }
                    }));
                }
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            Role::Tool => {
                let result = message.content.clone().unwrap_or_default();
                // functionResponse.response must be an object
                let response = match serde_json::from_str::<Value>(&result) {
                    Ok(Value::Object(obj)) => Value::Object(obj),
                    _ => json!({ "result": result }),
                };
                function_responses.push(json!({
                    "functionResponse": {
                        "name": message.name.clone().unwrap_or_default(),
                        "response": response,
                    }
                }));
            }
        }
    }
    flush_function_responses(&mut contents, &mut function_responses);

    let mut payload = json!({ "contents": contents });

    if !system_parts.is_empty() {
        payload["system_instruction"] = json!({ "parts": system_parts });
    }

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        payload["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    payload
}

fn flush_function_responses(contents: &mut Vec<Value>, parts: &mut Vec<Value>) {
    if !parts.is_empty() {
        contents.push(json!({ "role": "user", "parts": std::mem::take(parts) }));
    }
}

fn parse_response(body: GeminiResponse) -> Result<ChatResponse, LlmError> {
    let parts = body
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| LlmError::InvalidResponse("missing candidate content".to_string()))?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            let args = call.args.unwrap_or_else(|| Value::Object(Map::new()));
            tool_calls.push(ToolCall {
                id: uuid::Uuid::new_v4().to_string(),
                function: FunctionCall {
                    name: call.name,
                    arguments: args.to_string(),
                },
            });
        }
    }

    Ok(ChatResponse {
        content: (!text.is_empty()).then_some(text),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    #[test]
    fn payload_maps_system_and_tools() {
        let messages = vec![ChatMessage::system("be helpful"), ChatMessage::user("hi")];
        let tools = vec![ToolSchema {
            name: "get_current_time".to_string(),
            description: "now".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];

        let payload = build_payload(&messages, Some(tools.as_slice()));

        assert_eq!(payload["system_instruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(payload["contents"].as_array().unwrap().len(), 1);
        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(
            payload["tools"][0]["functionDeclarations"][0]["name"],
            "get_current_time"
        );
    }

    #[test]
    fn payload_maps_tool_round_trip() {
        let call = ToolCall {
            id: "1".to_string(),
            function: FunctionCall {
                name: "get_estimated_expense".to_string(),
                arguments: r#"{"destination":"Bali"}"#.to_string(),
            },
        };
        let messages = vec![
            ChatMessage::user("cost of Bali?"),
            ChatMessage::assistant(None, vec![call.clone()]),
            ChatMessage::tool_result(&call, r#"{"status":"success","daily_cost":45}"#),
            ChatMessage::tool_result(&call, "plain text"),
        ];

        let payload = build_payload(&messages, None);
        let contents = payload["contents"].as_array().unwrap();

        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["destination"], "Bali");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["daily_cost"],
            45
        );
        assert_eq!(
            contents[2]["parts"][1]["functionResponse"]["response"]["result"],
            "plain text"
        );
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn parallel_tool_results_share_one_content() {
        let time = ToolCall {
            id: "a".to_string(),
            function: FunctionCall {
                name: "get_current_time".to_string(),
                arguments: "{}".to_string(),
            },
        };
        let expense = ToolCall {
            id: "b".to_string(),
            function: FunctionCall {
                name: "get_estimated_expense".to_string(),
                arguments: r#"{"destination":"Rome"}"#.to_string(),
            },
        };
        let messages = vec![
            ChatMessage::user("Plan Rome"),
            ChatMessage::assistant(None, vec![time.clone(), expense.clone()]),
            ChatMessage::tool_result(&time, r#"{"current_time":"2024-05-01 10:00:00"}"#),
            ChatMessage::tool_result(&expense, r#"{"status":"success","daily_cost":120}"#),
            ChatMessage::assistant(Some("Noted.".to_string()), Vec::new()),
            ChatMessage::user("And Bali?"),
        ];

        let payload = build_payload(&messages, None);
        let contents = payload["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 5);
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["name"], "get_current_time");
        assert_eq!(responses[1]["functionResponse"]["name"], "get_estimated_expense");
        assert_eq!(contents[3]["role"], "model");
        assert_eq!(contents[4]["parts"][0]["text"], "And Bali?");
    }

    #[tokio::test]
    async fn network_failure_does_not_expose_api_key() {
        let client = GeminiClient::new("http://127.0.0.1:1", "SECRET-GEMINI-KEY");
        let err = client
            .chat_completion("gemini-test", &[ChatMessage::user("Rome?")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Network(_)));
        assert!(!err.to_string().contains("SECRET-GEMINI-KEY"), "{err}");
    }

    #[tokio::test]
    async fn returns_concatenated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Spring " }, { "text": "is best." }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), "test-key");
        let response = client
            .chat_completion("gemini-test", &[ChatMessage::user("When?")], None)
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("Spring is best."));
        assert!(response.tool_calls.is_none());
    }

    #[tokio::test]
    async fn returns_function_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{
                        "functionCall": { "name": "get_estimated_expense", "args": { "destination": "Bali" } }
                    }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), "test-key");
        let response = client
            .chat_completion("gemini-test", &[ChatMessage::user("Bali cost?")], None)
            .await
            .unwrap();

        let calls = response.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "get_estimated_expense");
        let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["destination"], "Bali");
        assert!(response.content.is_none());
    }

    #[tokio::test]
    async fn http_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), "bad-key");
        let err = client
            .chat_completion("gemini-test", &[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Status { status: 403, ref body } if body.contains("invalid")));
    }

    #[tokio::test]
    async fn generate_text_requires_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri(), "test-key");
        let err = client.generate_text("gemini-test", "hi").await.unwrap_err();

        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
