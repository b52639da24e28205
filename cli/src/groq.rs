use anyhow::{Context, Result, bail};
use log::debug;

use forma_core::ai::{
    ChatCompletionProvider, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};

/// OpenAI-compatible chat completions client (Groq by default).
pub struct GroqClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("forma-cli/{}", env!("CARGO_PKG_VERSION")))
            // generation of a full program takes a while
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl ChatCompletionProvider for GroqClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!("POST {} model={}", self.url, self.model);
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest::new(&self.model, messages))
            .send()
            .await
            .context("Failed to reach the chat completion API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Chat completion API error: {status} - {body}");
        }

        let data: ChatCompletionResponse = resp
            .json()
            .await
            .context("Failed to parse chat completion response")?;
        data.into_content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GroqClient {
        GroqClient::new(
            &format!("{}/openai/v1/chat/completions", server.uri()),
            "gsk_test",
            "llama-3.3-70b-versatile",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "temperature": 0.7,
                "max_tokens": 4000,
                "messages": [{"role": "user", "content": "plan please"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let reply = client
            .complete(&[ChatMessage::user("plan please")])
            .await
            .unwrap();
        assert_eq!(reply, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("401"), "{msg}");
        assert!(msg.contains("invalid api key"), "{msg}");
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.complete(&[ChatMessage::user("hi")]).await.is_err());
    }
}
