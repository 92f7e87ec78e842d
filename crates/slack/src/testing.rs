use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::web::{AuthIdentity, OutboundMessage, SlackChannel, SlackUser, SlackWebApi, WebApiError};

/// Web API fake that records every posted message.
#[derive(Default)]
pub(crate) struct RecordingWebApi {
    pub users: Vec<SlackUser>,
    pub channels: Vec<SlackChannel>,
    pub auth_user_id: Option<String>,
    pub post_error: Option<String>,
    pub posted: Mutex<Vec<OutboundMessage>>,
}

impl RecordingWebApi {
    pub fn failing_posts(error: &str) -> Self {
        Self { post_error: Some(error.to_owned()), ..Self::default() }
    }

    pub async fn posted(&self) -> Vec<OutboundMessage> {
        self.posted.lock().await.clone()
    }

    pub async fn texts(&self) -> Vec<String> {
        self.posted.lock().await.iter().map(|message| message.text.clone()).collect()
    }
}

#[async_trait]
impl SlackWebApi for RecordingWebApi {
    async fn auth_test(&self) -> Result<AuthIdentity, WebApiError> {
        match &self.auth_user_id {
            Some(user_id) => {
                Ok(AuthIdentity { user_id: user_id.clone(), user_name: "bot".to_owned() })
            }
            None => Err(WebApiError::Api { method: "auth.test", error: "invalid_auth".to_owned() }),
        }
    }

    async fn list_users(&self) -> Result<Vec<SlackUser>, WebApiError> {
        Ok(self.users.clone())
    }

    async fn list_channels(&self) -> Result<Vec<SlackChannel>, WebApiError> {
        Ok(self.channels.clone())
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<(), WebApiError> {
        if let Some(error) = &self.post_error {
            return Err(WebApiError::Api { method: "chat.postMessage", error: error.clone() });
        }
        self.posted.lock().await.push(message.clone());
        Ok(())
    }
}
