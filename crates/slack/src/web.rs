use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebApiError {
    #[error("slack web api request failed: {0}")]
    Http(String),
    #[error("slack web api `{method}` returned error `{error}`")]
    Api { method: &'static str, error: String },
    #[error("slack web api `{method}` response could not be decoded: {message}")]
    Decode { method: &'static str, message: String },
}

/// A plain-text reply. `thread_ts` threads it under an existing message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl OutboundMessage {
    pub fn to_channel(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), text: text.into(), thread_ts: None }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthIdentity {
    pub user_id: String,
    #[serde(default, rename = "user")]
    pub user_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_member: bool,
}

#[async_trait]
pub trait SlackWebApi: Send + Sync {
    async fn auth_test(&self) -> Result<AuthIdentity, WebApiError>;
    async fn list_users(&self) -> Result<Vec<SlackUser>, WebApiError>;
    async fn list_channels(&self) -> Result<Vec<SlackChannel>, WebApiError>;
    async fn post_message(&self, message: &OutboundMessage) -> Result<(), WebApiError>;
}

pub struct HttpSlackWebApi {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl HttpSlackWebApi {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, SLACK_API_BASE)
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), bot_token, base_url: base_url.into() }
    }

    async fn call(
        &self,
        method: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Value, WebApiError> {
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| WebApiError::Http(e.to_string()))?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| WebApiError::Decode { method, message: e.to_string() })?;
        check_ok(method, body)
    }

    async fn paginate<T>(&self, method: &'static str, field: &'static str) -> Result<Vec<T>, WebApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", "200")];
            if let Some(cursor) = cursor.as_deref() {
                query.push(("cursor", cursor));
            }
            let body = self.call(method, &query).await?;

            let page = body.get(field).cloned().unwrap_or(Value::Array(Vec::new()));
            let page: Vec<T> = serde_json::from_value(page)
                .map_err(|e| WebApiError::Decode { method, message: e.to_string() })?;
            debug!(method, page_len = page.len(), "fetched slack page");
            items.extend(page);

            cursor = next_cursor(&body);
            if cursor.is_none() {
                return Ok(items);
            }
        }
    }
}

#[async_trait]
impl SlackWebApi for HttpSlackWebApi {
    async fn auth_test(&self) -> Result<AuthIdentity, WebApiError> {
        let body = self.call("auth.test", &[]).await?;
        serde_json::from_value(body)
            .map_err(|e| WebApiError::Decode { method: "auth.test", message: e.to_string() })
    }

    async fn list_users(&self) -> Result<Vec<SlackUser>, WebApiError> {
        self.paginate("users.list", "members").await
    }

    async fn list_channels(&self) -> Result<Vec<SlackChannel>, WebApiError> {
        self.paginate("conversations.list", "channels").await
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<(), WebApiError> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(message)
            .send()
            .await
            .map_err(|e| WebApiError::Http(e.to_string()))?;
        let body = response.json::<Value>().await.map_err(|e| WebApiError::Decode {
            method: "chat.postMessage",
            message: e.to_string(),
        })?;
        check_ok("chat.postMessage", body).map(|_| ())
    }
}

fn check_ok(method: &'static str, body: Value) -> Result<Value, WebApiError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }
    let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown_error").to_owned();
    Err(WebApiError::Api { method, error })
}

fn next_cursor(body: &Value) -> Option<String> {
    body.get("response_metadata")
        .and_then(|meta| meta.get("next_cursor"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{check_ok, next_cursor, OutboundMessage, WebApiError};

    #[test]
    fn ok_false_becomes_api_error() {
        let error = check_ok("chat.postMessage", json!({"ok": false, "error": "channel_not_found"}))
            .expect_err("should fail");

        assert_eq!(
            error,
            WebApiError::Api { method: "chat.postMessage", error: "channel_not_found".to_owned() }
        );
    }

    #[test]
    fn missing_ok_flag_is_treated_as_failure() {
        assert!(check_ok("auth.test", json!({"user_id": "U1"})).is_err());
    }

    #[test]
    fn blank_cursor_ends_pagination() {
        assert_eq!(next_cursor(&json!({"response_metadata": {"next_cursor": ""}})), None);
        assert_eq!(
            next_cursor(&json!({"response_metadata": {"next_cursor": "dXNlcjpVMDYx"}})),
            Some("dXNlcjpVMDYx".to_owned())
        );
        assert_eq!(next_cursor(&json!({"ok": true})), None);
    }

    #[test]
    fn threaded_messages_serialize_thread_ts_only_when_set() {
        let plain = serde_json::to_value(OutboundMessage::to_channel("C1", "hi")).expect("json");
        let threaded =
            serde_json::to_value(OutboundMessage::to_channel("C1", "hi").in_thread("171.2"))
                .expect("json");

        assert_eq!(plain, json!({"channel": "C1", "text": "hi"}));
        assert_eq!(threaded["thread_ts"], "171.2");
    }
}
