use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use hanbot_core::{run_timestamp, RunRecord};
use hanbot_db::repositories::{RepositoryError, RunInfoRepository};

use crate::{
    commands::BotIdentity,
    replies,
    web::{OutboundMessage, SlackChannel, SlackWebApi, WebApiError},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not resolve bot identity: {0}")]
    Identity(WebApiError),
    #[error(transparent)]
    WebApi(#[from] WebApiError),
    #[error("run bookkeeping failed: {0}")]
    RunInfo(#[from] RepositoryError),
}

/// State established once the Slack session is ready.
#[derive(Clone, Debug)]
pub struct BotSession {
    pub identity: BotIdentity,
    pub channels: Vec<SlackChannel>,
    pub run: RunRecord,
}

impl BotSession {
    /// First channel the bot belongs to, else the first channel listed.
    pub fn welcome_channel(&self) -> Option<&SlackChannel> {
        self.channels.iter().find(|channel| channel.is_member).or_else(|| self.channels.first())
    }
}

/// Finds the bot's user id by display name, falling back to `auth.test`.
pub async fn resolve_identity(
    web: &dyn SlackWebApi,
    bot_name: &str,
) -> Result<BotIdentity, SessionError> {
    match web.list_users().await {
        Ok(users) => {
            if let Some(user) = users.iter().find(|user| user.name == bot_name) {
                return Ok(BotIdentity { user_id: user.id.clone(), name: bot_name.to_owned() });
            }
            info!(
                event_name = "bot.session.identity_fallback",
                bot_name,
                "no user named like the bot; asking auth.test"
            );
        }
        Err(error) => {
            warn!(
                event_name = "bot.session.identity_fallback",
                bot_name,
                error = %error,
                "users.list failed; asking auth.test"
            );
        }
    }

    let auth = web.auth_test().await.map_err(SessionError::Identity)?;
    Ok(BotIdentity { user_id: auth.user_id, name: bot_name.to_owned() })
}

/// Resolves identity, caches channels, and records this start. On the very
/// first start a welcome is posted; failing to post it is not fatal.
pub async fn start_session(
    web: &dyn SlackWebApi,
    run_info: &dyn RunInfoRepository,
    bot_name: &str,
    now: DateTime<Utc>,
) -> Result<BotSession, SessionError> {
    let identity = resolve_identity(web, bot_name).await?;
    let channels = web.list_channels().await?;
    let run = run_info.record_run(&run_timestamp(now)).await?;

    info!(
        event_name = "bot.session.started",
        bot_user_id = %identity.user_id,
        channel_count = channels.len(),
        first_run = run.is_first_run(),
        "slack session ready"
    );

    let session = BotSession { identity, channels, run };
    if session.run.is_first_run() {
        post_welcome(web, &session).await;
    }
    Ok(session)
}

async fn post_welcome(web: &dyn SlackWebApi, session: &BotSession) {
    let Some(channel) = session.welcome_channel() else {
        warn!(event_name = "bot.session.welcome_skipped", "no channel to welcome");
        return;
    };

    let message = OutboundMessage::to_channel(&channel.id, replies::welcome(&session.identity.name));
    match web.post_message(&message).await {
        Ok(()) => info!(
            event_name = "bot.session.welcome_posted",
            channel_id = %channel.id,
            "posted first-run welcome"
        ),
        Err(error) => warn!(
            event_name = "bot.session.welcome_failed",
            channel_id = %channel.id,
            error = %error,
            "could not post first-run welcome"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hanbot_core::RunRecord;
    use hanbot_db::repositories::{InMemoryBotStore, RunInfoRepository};

    use super::{resolve_identity, start_session, SessionError};
    use crate::testing::RecordingWebApi;
    use crate::web::{SlackChannel, SlackUser};

    fn channel(id: &str, is_member: bool) -> SlackChannel {
        SlackChannel { id: id.to_owned(), name: id.to_lowercase(), is_member }
    }

    fn web_with_bot_user() -> RecordingWebApi {
        RecordingWebApi {
            users: vec![
                SlackUser { id: "U1".to_owned(), name: "alice".to_owned(), is_bot: false },
                SlackUser { id: "UBOT".to_owned(), name: "han_bot".to_owned(), is_bot: true },
            ],
            channels: vec![channel("C1", false), channel("C2", true)],
            ..RecordingWebApi::default()
        }
    }

    #[tokio::test]
    async fn identity_comes_from_user_list_by_name() {
        let web = web_with_bot_user();

        let identity = resolve_identity(&web, "han_bot").await.expect("identity");

        assert_eq!(identity.user_id, "UBOT");
        assert_eq!(identity.name, "han_bot");
    }

    #[tokio::test]
    async fn identity_falls_back_to_auth_test() {
        let web = RecordingWebApi { auth_user_id: Some("UAUTH".to_owned()), ..RecordingWebApi::default() };

        let identity = resolve_identity(&web, "han_bot").await.expect("identity");

        assert_eq!(identity.user_id, "UAUTH");
    }

    #[tokio::test]
    async fn unresolvable_identity_is_an_error() {
        let web = RecordingWebApi::default();

        let result = resolve_identity(&web, "han_bot").await;

        assert!(matches!(result, Err(SessionError::Identity(_))));
    }

    #[tokio::test]
    async fn first_start_posts_welcome_once() {
        let web = web_with_bot_user();
        let store = InMemoryBotStore::new();
        let first = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single().expect("date");
        let second = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).single().expect("date");

        let session = start_session(&web, &store, "han_bot", first).await.expect("first start");
        assert_eq!(session.run, RunRecord::FirstRun);
        let again = start_session(&web, &store, "han_bot", second).await.expect("second start");
        assert!(!again.run.is_first_run());

        let posted = web.posted().await;
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].channel, "C2");
        assert!(posted[0].text.starts_with("Hi guys, roundhouse-kick anyone?"));
        assert_eq!(
            store.last_run().await.expect("last run"),
            Some("2026-10-19T09:00:00.000Z".to_owned())
        );
    }

    #[tokio::test]
    async fn welcome_failure_does_not_abort_start() {
        let web = RecordingWebApi {
            auth_user_id: Some("UBOT".to_owned()),
            channels: vec![channel("C1", true)],
            post_error: Some("not_in_channel".to_owned()),
            ..RecordingWebApi::default()
        };
        let store = InMemoryBotStore::new();

        let session = start_session(&web, &store, "han_bot", Utc::now()).await.expect("start");

        assert!(session.run.is_first_run());
    }

    #[tokio::test]
    async fn first_start_without_channels_skips_welcome() {
        let web = RecordingWebApi { auth_user_id: Some("UBOT".to_owned()), ..RecordingWebApi::default() };
        let store = InMemoryBotStore::new();

        start_session(&web, &store, "han_bot", Utc::now()).await.expect("start");

        assert!(web.posted().await.is_empty());
    }
}
