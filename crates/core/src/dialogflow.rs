//! Dialogflow ES intent detection over its REST API.

use crate::{
    intent::{ClassifiedIntent, ClassifierError, IntentClassifier},
    session::ConversationId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_DIALOGFLOW_BASE_URL: &str = "https://dialogflow.googleapis.com";
pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Classifies utterances with a Dialogflow agent's `detectIntent` endpoint.
pub struct DialogflowClassifier {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: String,
    language_code: String,
}

impl DialogflowClassifier {
    /// Creates a classifier for the agent in `project_id`.
    ///
    /// `access_token` is an OAuth bearer token for the project, for example the
    /// output of `gcloud auth print-access-token`.
    pub fn new(project_id: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_DIALOGFLOW_BASE_URL.to_string(),
            project_id,
            access_token,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    fn detect_intent_url(&self, conversation_id: &ConversationId) -> String {
        format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            conversation_id
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    query_result: Option<QueryResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    intent: Option<DetectedIntent>,
    #[serde(default)]
    parameters: HashMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectedIntent {
    #[serde(default)]
    display_name: String,
}

/// Flattens Dialogflow's structured parameter values into plain strings.
fn parameter_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Array(items) => items
            .into_iter()
            .map(parameter_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

impl From<DetectIntentResponse> for ClassifiedIntent {
    fn from(response: DetectIntentResponse) -> Self {
        let Some(result) = response.query_result else {
            return ClassifiedIntent::default();
        };
        ClassifiedIntent {
            intent_name: result
                .intent
                .map(|intent| intent.display_name)
                .unwrap_or_default(),
            parameters: result
                .parameters
                .into_iter()
                .map(|(key, value)| (key, parameter_to_string(value)))
                .collect(),
        }
    }
}

#[async_trait]
impl IntentClassifier for DialogflowClassifier {
    async fn classify(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ClassifiedIntent, ClassifierError> {
        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code: &self.language_code,
                },
            },
        };

        let response = self
            .client
            .post(self.detect_intent_url(conversation_id))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status { status, body });
        }

        let body: DetectIntentResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_intent_url() {
        let classifier = DialogflowClassifier::new("tutor-project".into(), "token".into())
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            classifier.detect_intent_url(&ConversationId::new("abc")),
            "http://localhost:8080/v2/projects/tutor-project/agent/sessions/abc:detectIntent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text: "set difficulty to hard",
                    language_code: DEFAULT_LANGUAGE_CODE,
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"queryInput": {"text": {"text": "set difficulty to hard", "languageCode": "en-US"}}})
        );
    }

    #[test]
    fn test_response_maps_intent_and_parameters() {
        let response: DetectIntentResponse = serde_json::from_value(json!({
            "responseId": "r-1",
            "queryResult": {
                "queryText": "set difficulty to hard",
                "parameters": {"difficulty": "hard", "count": 2, "tags": ["a", "b"]},
                "intent": {"name": "projects/p/agent/intents/1", "displayName": "set_difficulty"}
            }
        }))
        .unwrap();

        let intent = ClassifiedIntent::from(response);
        assert_eq!(intent.intent_name, "set_difficulty");
        assert_eq!(intent.parameters["difficulty"], "hard");
        assert_eq!(intent.parameters["count"], "2");
        assert_eq!(intent.parameters["tags"], "a, b");
    }

    #[test]
    fn test_response_without_match_has_empty_intent() {
        let response: DetectIntentResponse =
            serde_json::from_value(json!({"queryResult": {"queryText": "what is pi"}})).unwrap();
        let intent = ClassifiedIntent::from(response);
        assert!(intent.intent_name.is_empty());
        assert!(intent.parameters.is_empty());

        let response: DetectIntentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ClassifiedIntent::from(response), ClassifiedIntent::default());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_classifier_error() {
        let classifier = DialogflowClassifier::new("p".into(), "t".into())
            .with_base_url("http://127.0.0.1:9");
        let err = classifier
            .classify("hello", &ConversationId::new("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Request(_)));
    }
}
