use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ModelCall, Provider};
use crate::errors::GenerationError;
use crate::wire::{
    ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part,
};

const JSON_MIME: &str = "application/json";

/// Google Gemini `generateContent` with a structured-output schema.
pub struct GeminiProvider {
    model: String,
    api_key: String,
    api_base: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(model: String, api_key: String, api_base: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { model, api_key, api_base, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    pub fn request_body(call: &ModelCall) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: Some(call.instruction.clone()) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME.into(),
                response_schema: call.schema.clone(),
                temperature: call.temperature,
            },
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, call: &ModelCall) -> Result<String, GenerationError> {
        let url = self.endpoint();
        let body = Self::request_body(call);
        debug!(model = %self.model, temperature = call.temperature, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!(%status, "Gemini API error: {}", message);
            return Err(GenerationError::Transport(format!("Gemini API error ({status}): {message}")));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Transport(format!("unreadable Gemini envelope: {e}"))
        })?;

        if let Some(reason) = parsed.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = reason, "Gemini finished");
        }

        Ok(parsed.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response and hands back the request it saw.
    async fn one_shot_server(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + len {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn call() -> ModelCall {
        ModelCall {
            instruction: "Generate a list of 6 unique object ideas.".into(),
            schema: json!({"type": "ARRAY"}),
            temperature: 0.9,
        }
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let p = GeminiProvider::new("gemini-2.5-flash".into(), "k".into(), "https://example.test/".into(), 5).unwrap();
        assert_eq!(
            p.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn body_carries_schema_and_temperature() {
        let v = serde_json::to_value(GeminiProvider::request_body(&call())).unwrap();
        assert_eq!(v["generationConfig"]["responseMimeType"], JSON_MIME);
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(v["contents"][0]["role"], "user");
        assert!(v["contents"][0]["parts"][0]["text"].as_str().unwrap().contains("6 unique"));
    }

    #[tokio::test]
    async fn success_returns_candidate_text() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "[{\"object\":\"a\",\"prompt\":\"b\"}]"}]}, "finishReason": "STOP"}]
        })
        .to_string();
        let (base, server) = one_shot_server("200 OK", body).await;
        let p = GeminiProvider::new("m".into(), "secret".into(), base, 5).unwrap();

        let text = p.generate(&call()).await.unwrap();
        assert_eq!(text, "[{\"object\":\"a\",\"prompt\":\"b\"}]");

        let seen = server.await.unwrap();
        assert!(seen.starts_with("POST /v1beta/models/m:generateContent"));
        assert!(seen.to_ascii_lowercase().contains("x-goog-api-key: secret"));
    }

    #[tokio::test]
    async fn error_status_is_transport() {
        let body = json!({"error": {"code": 503, "message": "model overloaded"}}).to_string();
        let (base, _server) = one_shot_server("503 Service Unavailable", body).await;
        let p = GeminiProvider::new("m".into(), "k".into(), base, 5).unwrap();

        match p.generate(&call()).await {
            Err(GenerationError::Transport(msg)) => assert!(msg.contains("model overloaded")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_candidates_yields_empty_text() {
        let (base, _server) = one_shot_server("200 OK", "{}".into()).await;
        let p = GeminiProvider::new("m".into(), "k".into(), base, 5).unwrap();
        assert_eq!(p.generate(&call()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn unreachable_service_is_transport() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let p = GeminiProvider::new("m".into(), "k".into(), format!("http://{addr}"), 2).unwrap();
        assert!(matches!(p.generate(&call()).await, Err(GenerationError::Transport(_))));
    }
}
