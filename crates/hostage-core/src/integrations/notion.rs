use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::error::{ConfigError, CoreError, Result};
use crate::integrations::traits::{ExternalTask, ExternalTaskSource};
use crate::storage::NotionConfig;
use crate::timestamp::parse_timestamp_lenient;

const NOTION_VERSION: &str = "2022-06-28";
const STATUS_PROPERTY: &str = "Status";
const DUE_PROPERTY: &str = "Due Date";
const DONE_STATUS: &str = "Done";

/// Reads overdue tasks from a Notion database.
pub struct NotionTaskSource {
    client: Client,
    api_token: String,
    database_id: String,
    base_url: Url,
}

impl NotionTaskSource {
    /// Build a source from explicit credentials.
    ///
    /// # Errors
    /// Returns a configuration error if `base_url` is not a valid URL.
    pub fn new(
        api_token: impl Into<String>,
        database_id: impl Into<String>,
        base_url: &str,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "notion.base_url".into(),
            message: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            api_token: api_token.into(),
            database_id: database_id.into(),
            base_url,
        })
    }

    /// Build a source from the `[notion]` config section.
    ///
    /// # Errors
    /// Returns a configuration error if the token or database id is missing.
    pub fn from_config(config: &NotionConfig) -> Result<Self> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: key.into(),
                    message: "not set".into(),
                })
        };
        let token = required(&config.token, "notion.token")?;
        let database_id = required(&config.database_id, "notion.database_id")?;
        Self::new(token, database_id, &config.base_url)
    }

    fn query_url(&self) -> Result<Url> {
        let path = format!(
            "{}/v1/databases/{}/query",
            self.base_url.as_str().trim_end_matches('/'),
            self.database_id
        );
        Url::parse(&path).map_err(|e| {
            ConfigError::InvalidValue {
                key: "notion.database_id".into(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn query_body(now: DateTime<Utc>, cursor: Option<&str>) -> Value {
        let mut body = json!({
            "filter": {
                "and": [
                    {
                        "property": STATUS_PROPERTY,
                        "status": { "does_not_equal": DONE_STATUS }
                    },
                    {
                        "property": DUE_PROPERTY,
                        "date": { "before": now.to_rfc3339_opts(SecondsFormat::Secs, true) }
                    }
                ]
            }
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        body
    }
}

/// Extract one task from a Notion page object.
fn page_to_task(page: &Value) -> ExternalTask {
    let properties = &page["properties"];

    // The title property may have any name; it is the one typed "title".
    let title = properties
        .as_object()
        .and_then(|props| props.values().find(|p| p["type"] == "title"))
        .and_then(|p| p["title"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["plain_text"].as_str())
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    ExternalTask {
        external_id: page["id"].as_str().map(str::to_string),
        title,
        due_at: parse_timestamp_lenient("due_at", properties[DUE_PROPERTY]["date"]["start"].as_str()),
    }
}

#[async_trait]
impl ExternalTaskSource for NotionTaskSource {
    fn name(&self) -> &str {
        "notion"
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<ExternalTask>> {
        let url = self.query_url()?;
        let mut tasks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let resp = self
                .client
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_token))
                .header("Notion-Version", NOTION_VERSION)
                .header("Content-Type", "application/json")
                .json(&Self::query_body(now, cursor.as_deref()))
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(CoreError::CollaboratorUnavailable {
                    collaborator: "notion",
                    message: format!("Notion API error (HTTP {status}): {text}"),
                });
            }

            let data: Value = resp.json().await?;
            if let Some(results) = data["results"].as_array() {
                tasks.extend(results.iter().map(page_to_task));
            }

            match data["next_cursor"].as_str() {
                Some(next) if data["has_more"].as_bool() == Some(true) => {
                    cursor = Some(next.to_string());
                }
                _ => break,
            }
        }

        tracing::debug!(count = tasks.len(), "notion overdue tasks fetched");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page(id: &str, title: &str, due: &str) -> Value {
        json!({
            "object": "page",
            "id": id,
            "properties": {
                "Name": { "type": "title", "title": [{ "plain_text": title }] },
                "Due Date": { "type": "date", "date": { "start": due } },
                "Status": { "type": "status", "status": { "name": "In progress" } }
            }
        })
    }

    #[test]
    fn page_parsing_tolerates_missing_fields() {
        let task = page_to_task(&json!({ "id": "p1", "properties": {} }));
        assert_eq!(task.title, "Untitled");
        assert!(task.due_at.is_none());

        let task = page_to_task(&page("p2", "Ship it", "2024-05-01"));
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.due_at, Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn from_config_requires_credentials() {
        assert!(NotionTaskSource::from_config(&NotionConfig::default()).is_err());
        let cfg = NotionConfig {
            token: Some("t".into()),
            database_id: Some("db".into()),
            ..NotionConfig::default()
        };
        assert!(NotionTaskSource::from_config(&cfg).is_ok());
    }

    #[tokio::test]
    async fn list_overdue_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        let first = json!({
            "results": [page("a", "First", "2024-01-01")],
            "has_more": true,
            "next_cursor": "cur-1"
        });
        let second = json!({
            "results": [page("b", "Second", "2024-01-02T10:00:00.000Z")],
            "has_more": false,
            "next_cursor": null
        });

        let _m1 = server
            .mock("POST", "/v1/databases/db1/query")
            .match_header("Notion-Version", NOTION_VERSION)
            .match_header("Authorization", "Bearer secret-token")
            // First page carries no cursor, so the body ends with the filter.
            .match_body(mockito::Matcher::Regex(r"\]\}\}$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(first.to_string())
            .expect(1)
            .create_async()
            .await;
        let _m2 = server
            .mock("POST", "/v1/databases/db1/query")
            .match_body(mockito::Matcher::PartialJson(json!({ "start_cursor": "cur-1" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(second.to_string())
            .expect(1)
            .create_async()
            .await;

        let source = NotionTaskSource::new("secret-token", "db1", &server.url()).unwrap();
        let tasks = source.list_overdue(Utc::now()).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "First");
        assert_eq!(tasks[1].external_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn http_error_is_collaborator_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/databases/db1/query")
            .with_status(401)
            .with_body(r#"{"message":"API token is invalid."}"#)
            .create_async()
            .await;

        let source = NotionTaskSource::new("bad", "db1", &server.url()).unwrap();
        let err = source.list_overdue(Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::CollaboratorUnavailable { collaborator: "notion", .. }
        ));
    }
}
