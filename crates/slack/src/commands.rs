use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use hanbot_core::{AddRestaurantOutcome, ApplicationError, ContentTable, RestaurantName};
use hanbot_db::repositories::BotRepositories;

use crate::{
    events::{EventContext, EventHandlerError, HandlerResult, MessageEvent},
    replies,
    web::{OutboundMessage, SlackWebApi},
};

/// Every command the bot understands, in trigger priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotCommand {
    Joke,
    Help,
    LunchSuggest,
    LunchAdd,
    LunchDelete,
    LunchList,
    Gtfo,
    Greeting,
}

/// Substring triggers checked against the lowercased message text. The
/// first match wins.
pub const TRIGGERS: [(&str, BotCommand); 7] = [
    ("joke", BotCommand::Joke),
    ("!help", BotCommand::Help),
    ("!lunchsuggest", BotCommand::LunchSuggest),
    ("!lunchadd", BotCommand::LunchAdd),
    ("!lunchdel", BotCommand::LunchDelete),
    ("!lunchlist", BotCommand::LunchList),
    ("!gtfo", BotCommand::Gtfo),
];

impl BotCommand {
    pub fn classify(text: &str) -> Self {
        let lowered = text.to_lowercase();
        TRIGGERS
            .iter()
            .find(|(trigger, _)| lowered.contains(trigger))
            .map(|(_, command)| *command)
            .unwrap_or(Self::Greeting)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Joke => "joke",
            Self::Help => "help",
            Self::LunchSuggest => "lunch_suggest",
            Self::LunchAdd => "lunch_add",
            Self::LunchDelete => "lunch_delete",
            Self::LunchList => "lunch_list",
            Self::Gtfo => "gtfo",
            Self::Greeting => "greeting",
        }
    }
}

/// Who the bot is in the workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub name: String,
}

/// Nickname that always addresses the bot, whatever its configured name.
pub const NICKNAME: &str = "han";

/// A message is for the bot when someone else sent it and its text
/// mentions the nickname or the bot's name.
pub fn is_addressed(event: &MessageEvent, identity: &BotIdentity) -> bool {
    if event.user_id == identity.user_id {
        return false;
    }
    let lowered = event.text.to_lowercase();
    let name = identity.name.to_lowercase();
    lowered.contains(NICKNAME) || (!name.is_empty() && lowered.contains(&name))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("message has no `name:` tag")]
    MissingMarker,
    #[error("`name:` tag is not closed with `:`")]
    Unterminated,
    #[error("`name:` tag has an empty value")]
    EmptyValue,
}

const TAG_MARKER: &str = "name:";

/// Extracts the restaurant from a `name:<value>:` tag. The marker is matched
/// ASCII case-insensitively and the value runs to the next colon.
pub fn parse_name_tag(text: &str) -> Result<RestaurantName, TagError> {
    let start = text.to_ascii_lowercase().find(TAG_MARKER).ok_or(TagError::MissingMarker)?;
    let rest = &text[start + TAG_MARKER.len()..];
    let end = rest.find(':').ok_or(TagError::Unterminated)?;
    RestaurantName::parse(&rest[..end]).map_err(|_| TagError::EmptyValue)
}

/// Replies stay in the conversation the message came from: a message
/// inside a thread is answered in that thread.
fn reply_to(event: &MessageEvent, text: impl Into<String>) -> OutboundMessage {
    let message = OutboundMessage::to_channel(&event.channel_id, text);
    match &event.thread_ts {
        Some(thread_ts) => message.in_thread(thread_ts.clone()),
        None => message,
    }
}

pub struct CommandRouter {
    web: Arc<dyn SlackWebApi>,
    repositories: BotRepositories,
    identity: BotIdentity,
}

impl CommandRouter {
    pub fn new(
        web: Arc<dyn SlackWebApi>,
        repositories: BotRepositories,
        identity: BotIdentity,
    ) -> Self {
        Self { web, repositories, identity }
    }

    pub async fn route(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        if !is_addressed(event, &self.identity) {
            debug!(
                event_name = "bot.command.not_addressed",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                "message not addressed to bot"
            );
            return Ok(HandlerResult::Ignored);
        }

        let command = BotCommand::classify(&event.text);
        info!(
            event_name = "bot.command.dispatched",
            correlation_id = %ctx.correlation_id,
            command = command.label(),
            channel_id = %event.channel_id,
            conversation = event.conversation_kind().label(),
            user_id = %event.user_id,
            "dispatching command"
        );

        let replies = match self.replies_for(command, event).await {
            Ok(replies) => replies,
            Err(app_error) => {
                let interface = app_error.into_interface(ctx.correlation_id.clone());
                error!(
                    event_name = "bot.command.failed",
                    correlation_id = %ctx.correlation_id,
                    command = command.label(),
                    error = %interface,
                    "command failed; replying with an error notice"
                );
                vec![reply_to(event, interface.user_message())]
            }
        };

        for reply in &replies {
            self.web.post_message(reply).await?;
        }
        Ok(HandlerResult::Responded { posted: replies.len() })
    }

    async fn replies_for(
        &self,
        command: BotCommand,
        event: &MessageEvent,
    ) -> Result<Vec<OutboundMessage>, ApplicationError> {
        let reply = |text: String| vec![reply_to(event, text)];

        match command {
            BotCommand::Joke => {
                let thread_ts = event.thread_ts.clone().unwrap_or_else(|| event.ts.clone());
                let text = self.pick(ContentTable::Jokes).await?;
                Ok(vec![OutboundMessage::to_channel(&event.channel_id, text).in_thread(thread_ts)])
            }
            BotCommand::Help => {
                let entries = self.repositories.catalog.list().await?;
                if entries.is_empty() {
                    return Ok(reply(replies::EMPTY_HELP.to_owned()));
                }
                Ok(entries
                    .iter()
                    .map(|entry| reply_to(event, replies::help_line(entry)))
                    .collect())
            }
            BotCommand::LunchSuggest => {
                let text = self.pick(ContentTable::Restaurants).await?;
                Ok(reply(text))
            }
            BotCommand::LunchAdd => {
                let name = match parse_name_tag(&event.text) {
                    Ok(name) => name,
                    Err(tag_error) => {
                        debug!(event_name = "bot.command.bad_tag", error = %tag_error, "lunch add without a usable tag");
                        return Ok(reply(replies::tag_hint("add")));
                    }
                };
                let text = match self.repositories.restaurants.add(&name).await? {
                    AddRestaurantOutcome::Added => {
                        info!(event_name = "bot.command.restaurant_added", restaurant = %name, "restaurant added; rotation reset");
                        replies::added(&name)
                    }
                    AddRestaurantOutcome::AlreadyExists => replies::already_listed(&name),
                };
                Ok(reply(text))
            }
            BotCommand::LunchDelete => {
                let name = match parse_name_tag(&event.text) {
                    Ok(name) => name,
                    Err(tag_error) => {
                        debug!(event_name = "bot.command.bad_tag", error = %tag_error, "lunch delete without a usable tag");
                        return Ok(reply(replies::tag_hint("delete")));
                    }
                };
                let text = if self.repositories.restaurants.delete_by_name(&name).await? {
                    info!(event_name = "bot.command.restaurant_deleted", restaurant = %name, "restaurant deleted");
                    replies::deleted(&name)
                } else {
                    replies::NOT_FOUND.to_owned()
                };
                Ok(reply(text))
            }
            BotCommand::LunchList => {
                let restaurants = self.repositories.restaurants.list().await?;
                let lines = restaurants
                    .iter()
                    .filter_map(|restaurant| {
                        let line = replies::lunch_line(restaurant);
                        if line.is_none() {
                            warn!(
                                event_name = "bot.command.blank_restaurant",
                                row_id = restaurant.id,
                                "skipping restaurant row with a blank name"
                            );
                        }
                        line
                    })
                    .map(|line| reply_to(event, line))
                    .collect::<Vec<_>>();
                if lines.is_empty() {
                    return Ok(reply(replies::EMPTY_LUNCH_LIST.to_owned()));
                }
                Ok(lines)
            }
            BotCommand::Gtfo => Ok(reply(replies::GTFO.to_owned())),
            BotCommand::Greeting => Ok(reply(replies::GREETING.to_owned())),
        }
    }

    async fn pick(&self, table: ContentTable) -> Result<String, ApplicationError> {
        let picked = self.repositories.selector.select_and_consume(table, None).await?;
        Ok(match picked {
            Some(picked) => {
                debug!(
                    event_name = "bot.selector.picked",
                    table = table.label(),
                    row_id = picked.id,
                    used = picked.used,
                    "picked least-used row"
                );
                match table {
                    ContentTable::Restaurants => replies::suggestion(&picked.content),
                    ContentTable::Jokes | ContentTable::Bandito => picked.content,
                }
            }
            None => {
                info!(event_name = "bot.selector.empty", table = table.label(), "nothing to pick from");
                replies::nothing_to_pick(table)
            }
        })
    }
}
