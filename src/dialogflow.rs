//! Dialogflow ES intent detection.

mod auth;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::DialogflowConfig;
use crate::error::{BotError, Result};
use crate::types::ConversationContext;

pub use auth::TokenProvider;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    fulfillment_text: Option<String>,
}

pub struct IntentClient {
    http: reqwest::Client,
    api_base: String,
    project_id: String,
    language_code: String,
    tokens: TokenProvider,
}

impl IntentClient {
    pub fn new(config: &DialogflowConfig, tokens: TokenProvider) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            language_code: config.language_code.clone(),
            tokens,
        }
    }

    /// Sends `text` verbatim within the session named by `context`.
    ///
    /// Returns the fulfillment text unmodified, or an empty string when the
    /// agent produced none.
    pub async fn detect_intent(&self, context: &ConversationContext, text: &str) -> Result<String> {
        let url = format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.api_base,
            self.project_id,
            context.session_id()
        );
        debug!("Sending query to Dialogflow session {}", context.session_id());

        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code: &self.language_code,
                },
            },
        };
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::DialogflowApi { status, message });
        }

        let api_response: DetectIntentResponse = response.json().await?;
        let fulfillment = api_response
            .query_result
            .and_then(|result| result.fulfillment_text)
            .unwrap_or_default();
        debug!("Received fulfillment from Dialogflow");
        Ok(fulfillment)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> IntentClient {
        let config = DialogflowConfig {
            project_id: "coey-agent".to_string(),
            credentials: PathBuf::from("/unused.json"),
            language_code: "en-us".to_string(),
            api_base: server.base_url(),
        };
        IntentClient::new(&config, TokenProvider::fixed("ya29.test"))
    }

    #[tokio::test]
    async fn forwards_text_verbatim_and_returns_fulfillment() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/projects/coey-agent/agent/sessions/session-1:detectIntent")
                .header("authorization", "Bearer ya29.test")
                .json_body(json!({
                    "queryInput": {"text": {"text": "<@UBOT> Who are you?", "languageCode": "en-us"}}
                }));
            then.status(200).json_body(json!({
                "responseId": "r1",
                "queryResult": {"fulfillmentText": "I am *Coey*, your reporting bot."}
            }));
        });

        let context = ConversationContext::from("session-1".to_string());
        let reply = client(&server)
            .detect_intent(&context, "<@UBOT> Who are you?")
            .await
            .expect("detect intent");
        assert_eq!(reply, "I am *Coey*, your reporting bot.");
        mock.assert();
    }

    #[tokio::test]
    async fn missing_fulfillment_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"queryResult": {}}));
        });

        let reply = client(&server)
            .detect_intent(&ConversationContext::fresh(), "hmm")
            .await
            .expect("detect intent");
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn api_error_carries_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(403).body("permission denied");
        });

        let err = client(&server)
            .detect_intent(&ConversationContext::fresh(), "hi")
            .await
            .expect_err("403");
        assert!(matches!(
            err,
            BotError::DialogflowApi { status, message }
                if status.as_u16() == 403 && message == "permission denied"
        ));
    }
}
