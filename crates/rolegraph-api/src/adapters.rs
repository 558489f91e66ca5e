//! Adapters that bridge external services to the domain layer.
//!
//! The domain layer (rolegraph-domain) defines [`IntentResolver`] and ships an
//! offline [`KeywordResolver`](rolegraph_domain::KeywordResolver). This module
//! provides [`LlmIntentResolver`], which asks a hosted language model with a
//! Gemini-style `generateContent` API to classify the command and then reads
//! the first JSON object out of the reply with
//! [`parse_structured_output`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use rolegraph_domain::{
    parse_structured_output, DomainError, DomainResult, IntentResolver, ResolvedIntent,
};

/// Header carrying the API key, so the key never appears in request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for [`LlmIntentResolver`].
#[derive(Debug, Clone)]
pub struct LlmResolverConfig {
    /// Base URL of the API, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// Intent resolver backed by a hosted language model.
pub struct LlmIntentResolver {
    config: LlmResolverConfig,
    client: Client,
}

impl LlmIntentResolver {
    /// Creates a resolver with its own HTTP client.
    pub fn new(config: LlmResolverConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::ResolverUnavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn map_http_error(error: reqwest::Error) -> DomainError {
        let message = if error.is_timeout() {
            format!("request timeout: {error}")
        } else if error.is_connect() {
            format!("connection error: {error}")
        } else {
            format!("HTTP error: {error}")
        };
        DomainError::ResolverUnavailable { message }
    }
}

#[async_trait]
impl IntentResolver for LlmIntentResolver {
    #[instrument(skip(self, text), fields(model = %self.config.model))]
    async fn resolve(&self, text: &str) -> DomainResult<ResolvedIntent> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(text) }] }]
        });

        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_http_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DomainError::ResolverUnavailable {
                message: format!("model endpoint returned {status}"),
            });
        }

        let reply: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| DomainError::ResolverUnavailable {
                    message: format!("failed to decode model response: {e}"),
                })?;

        let text = reply.first_text().unwrap_or_default();
        debug!(reply_len = text.len(), "model replied");
        Ok(parse_structured_output(text))
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }
}

/// Supported actions with a one-line gloss, in prompt order.
const ACTIONS: [(&str, &str); 5] = [
    ("create_permission", "create a new permission"),
    ("create_role", "create a new role"),
    ("assign_permission", "grant an existing or new permission to a role"),
    ("list_permissions", "list every permission"),
    ("list_roles", "list every role"),
];

/// Worked examples shown to the model.
const EXAMPLES: [(&str, &str); 6] = [
    (
        "Create a permission called publish content",
        r#"{"action": "create_permission", "parameters": {"name": "publish_content", "description": "Permission to publish content"}, "confidence": 0.95}"#,
    ),
    (
        "Create role editor",
        r#"{"action": "create_role", "parameters": {"name": "editor", "description": "Editor role"}, "confidence": 0.95}"#,
    ),
    (
        "Give editor permission to delete posts",
        r#"{"action": "assign_permission", "parameters": {"role_name": "editor", "permission_name": "delete_posts"}, "confidence": 0.95}"#,
    ),
    (
        "Let editors delete posts",
        r#"{"action": "assign_permission", "parameters": {"role_name": "editor", "permission_name": "delete_posts"}, "confidence": 0.95}"#,
    ),
    (
        "Assign delete posts to editor",
        r#"{"action": "assign_permission", "parameters": {"role_name": "editor", "permission_name": "delete_posts"}, "confidence": 0.95}"#,
    ),
    (
        "Show all permissions",
        r#"{"action": "list_permissions", "parameters": {}, "confidence": 0.95}"#,
    ),
];

/// Builds the classification prompt for one command.
pub fn build_prompt(command: &str) -> String {
    let mut prompt = String::from(
        "You translate natural language commands for a role-based access control \
         system into structured actions.\n\nActions:\n",
    );
    for (i, (action, gloss)) in ACTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {action} - {gloss}\n", i + 1));
    }
    prompt.push_str(
        "Use \"unknown\" when the command matches none of them.\n\n\
         Reply with one JSON object of the form \
         {\"action\": \"...\", \"parameters\": {...}, \"confidence\": 0.0}.\n\nExamples:\n",
    );
    for (input, output) in EXAMPLES {
        prompt.push_str(&format!("- \"{input}\" -> {output}\n"));
    }
    prompt.push_str(&format!(
        "\nCommand: \"{}\"\n\nRespond only with valid JSON:\n",
        command.replace('"', "'")
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegraph_domain::IntentKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/models/test-model:generateContent";

    /// Helper function to start a mock server and create a resolver pointing to it
    async fn setup_resolver() -> (MockServer, LlmIntentResolver) {
        let mock_server = MockServer::start().await;
        let resolver = LlmIntentResolver::new(LlmResolverConfig {
            endpoint: mock_server.uri(),
            model: "test-model".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        (mock_server, resolver)
    }

    fn reply_with_text(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[tokio::test]
    async fn test_resolve_reads_fenced_json_reply() {
        let (mock_server, resolver) = setup_resolver().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(reply_with_text(
                "```json\n{\"action\": \"assign_permission\", \"parameters\": \
                 {\"role_name\": \"editor\", \"permission_name\": \"delete_posts\"}, \
                 \"confidence\": 0.9}\n```",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let intent = resolver
            .resolve("Give editor permission to delete posts")
            .await
            .unwrap();

        assert_eq!(intent.intent_kind(), Some(IntentKind::AssignPermission));
        assert_eq!(intent.parameter("role_name"), Some("editor"));
        assert_eq!(intent.parameter("permission_name"), Some("delete_posts"));
        assert!((intent.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_resolve_prose_reply_is_unknown() {
        let (mock_server, resolver) = setup_resolver().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(reply_with_text("I am not sure what you mean."))
            .mount(&mock_server)
            .await;

        let intent = resolver.resolve("asdkjashdkj").await.unwrap();

        assert_eq!(intent.intent_kind(), Some(IntentKind::Unknown));
        assert_eq!(intent.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_resolve_empty_candidates_is_unknown() {
        let (mock_server, resolver) = setup_resolver().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&mock_server)
            .await;

        let intent = resolver.resolve("show roles").await.unwrap();

        assert_eq!(intent.intent_kind(), Some(IntentKind::Unknown));
    }

    #[tokio::test]
    async fn test_resolve_server_error_is_unavailable() {
        let (mock_server, resolver) = setup_resolver().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = resolver.resolve("show roles").await;

        assert!(matches!(
            result,
            Err(DomainError::ResolverUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_timeout_is_unavailable() {
        let mock_server = MockServer::start().await;
        let resolver = LlmIntentResolver::new(LlmResolverConfig {
            endpoint: mock_server.uri(),
            model: "test-model".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_millis(50),
        })
        .unwrap();

        Mock::given(method("POST"))
            .respond_with(reply_with_text("{}").set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let result = resolver.resolve("show roles").await;

        assert!(matches!(
            result,
            Err(DomainError::ResolverUnavailable { .. })
        ));
    }

    #[test]
    fn test_prompt_lists_actions_and_command() {
        let prompt = build_prompt("Create role \"editor\"");

        for (action, _) in ACTIONS {
            assert!(prompt.contains(action), "missing action {action}");
        }
        assert!(prompt.contains("Command: \"Create role 'editor'\""));
        assert!(prompt.trim_end().ends_with("Respond only with valid JSON:"));
    }

    #[test]
    fn test_url_joins_endpoint_and_model() {
        let resolver = LlmIntentResolver::new(LlmResolverConfig {
            endpoint: "https://example.test/v1beta/".to_string(),
            model: "flash".to_string(),
            api_key: "k".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        assert_eq!(
            resolver.url(),
            "https://example.test/v1beta/models/flash:generateContent"
        );
    }
}
