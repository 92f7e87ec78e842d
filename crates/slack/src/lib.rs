//! Slack side of the bot.
//!
//! - `web` - Web API calls (`auth.test`, `users.list`, `conversations.list`, `chat.postMessage`)
//! - `websocket` / `socket` - Socket Mode transport and the reconnecting event loop
//! - `events` - envelope decoding and dispatch by event type
//! - `commands` - addressing gate, trigger matching, and the command router
//! - `session` - bot identity and the first-run welcome
//!
//! ```text
//! Socket Mode → SocketModeRunner → EventDispatcher → MessageHandler → CommandRouter
//!                                                                        ↓
//!                                                  repositories + chat.postMessage
//! ```

pub mod commands;
pub mod events;
pub mod replies;
pub mod session;
pub mod socket;
pub mod web;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{BotCommand, BotIdentity, CommandRouter};
pub use events::{bot_dispatcher, EventDispatcher};
pub use session::{start_session, BotSession, SessionError};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport};
pub use web::{HttpSlackWebApi, OutboundMessage, SlackWebApi};
pub use websocket::WebSocketTransport;
