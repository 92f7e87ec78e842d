use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::{
    events::{SlackEnvelope, SlackEvent},
    socket::{SocketTransport, TransportError},
    web::SLACK_API_BASE,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One decoded Socket Mode frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    Ignored,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    reason: Option<String>,
}

pub fn parse_socket_frame(text: &str) -> Result<SocketFrame, serde_json::Error> {
    let raw: RawFrame = serde_json::from_str(text)?;
    Ok(match (raw.frame_type.as_str(), raw.envelope_id) {
        ("hello", _) => SocketFrame::Hello,
        ("disconnect", _) => {
            SocketFrame::Disconnect { reason: raw.reason.unwrap_or_else(|| "unknown".to_owned()) }
        }
        ("events_api", Some(envelope_id)) => SocketFrame::Envelope(SlackEnvelope {
            envelope_id,
            event: SlackEvent::from_events_api_payload(&raw.payload),
        }),
        // Slash commands and interactivity still need an ack.
        (_, Some(envelope_id)) => SocketFrame::Envelope(SlackEnvelope {
            envelope_id,
            event: SlackEvent::Unsupported { event_type: raw.frame_type },
        }),
        (_, None) => SocketFrame::Ignored,
    })
}

/// Socket Mode over `tokio-tungstenite`, authenticated with the app-level
/// token.
pub struct WebSocketTransport {
    http: reqwest::Client,
    app_token: SecretString,
    base_url: String,
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<SplitStream<WsStream>>>,
}

impl WebSocketTransport {
    pub fn new(app_token: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_token,
            base_url: SLACK_API_BASE.to_owned(),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    async fn open_connection_url(&self) -> Result<String, TransportError> {
        let body = self
            .http
            .post(format!("{}/apps.connections.open", self.base_url))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
            return Err(TransportError::Connect(format!("apps.connections.open: {error}")));
        }
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| TransportError::Connect("apps.connections.open returned no url".to_owned()))
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(TransportError::Acknowledge("not connected".to_owned()));
        };
        sink.send(message).await.map_err(|e| TransportError::Acknowledge(e.to_string()))
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_connection_url().await?;
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, source) = stream.split();
        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = Some(source);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut reader = self.reader.lock().await;
        let Some(source) = reader.as_mut() else {
            return Err(TransportError::Receive("not connected".to_owned()));
        };

        loop {
            let message = match source.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Err(TransportError::Receive("stream ended".to_owned())),
            };

            match message {
                Message::Text(text) => match parse_socket_frame(text.as_str()) {
                    Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                    Ok(SocketFrame::Hello) => {
                        info!(event_name = "ingress.slack.hello", "socket mode session ready")
                    }
                    Ok(SocketFrame::Disconnect { reason }) => {
                        return Err(TransportError::Receive(format!(
                            "server requested disconnect: {reason}"
                        )));
                    }
                    Ok(SocketFrame::Ignored) => {}
                    Err(error) => {
                        debug!(error = %error, "skipping undecodable socket mode frame")
                    }
                },
                Message::Ping(payload) => self.send(Message::Pong(payload)).await?,
                Message::Close(_) => {
                    return Err(TransportError::Receive("closed by server".to_owned()))
                }
                _ => {}
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        self.send(Message::Text(ack.into())).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.reader.lock().await.take();
        let Some(mut sink) = self.writer.lock().await.take() else {
            return Ok(());
        };
        sink.close().await.map_err(|e| TransportError::Disconnect(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_socket_frame, SocketFrame};
    use crate::events::SlackEvent;

    #[test]
    fn hello_and_disconnect_frames_are_control_frames() {
        assert_eq!(
            parse_socket_frame(r#"{"type":"hello","num_connections":1}"#).expect("frame"),
            SocketFrame::Hello
        );
        assert_eq!(
            parse_socket_frame(r#"{"type":"disconnect","reason":"refresh_requested"}"#)
                .expect("frame"),
            SocketFrame::Disconnect { reason: "refresh_requested".to_owned() }
        );
    }

    #[test]
    fn events_api_frames_become_envelopes() {
        let frame = parse_socket_frame(
            r#"{
                "envelope_id": "57d6a792-4d35-4d0b-b6aa-3361493e1caf",
                "type": "events_api",
                "payload": {
                    "type": "event_callback",
                    "event": {
                        "type": "message",
                        "channel": "C1",
                        "user": "U1",
                        "text": "han !lunchlist",
                        "ts": "1.000"
                    }
                }
            }"#,
        )
        .expect("frame");

        let SocketFrame::Envelope(envelope) = frame else {
            panic!("expected an envelope frame");
        };
        assert_eq!(envelope.envelope_id, "57d6a792-4d35-4d0b-b6aa-3361493e1caf");
        assert!(matches!(envelope.event, SlackEvent::Message(ref event) if event.text == "han !lunchlist"));
    }

    #[test]
    fn other_envelopes_are_still_acknowledged() {
        let frame =
            parse_socket_frame(r#"{"envelope_id":"e1","type":"slash_commands","payload":{}}"#)
                .expect("frame");

        assert_eq!(
            frame,
            SocketFrame::Envelope(crate::events::SlackEnvelope {
                envelope_id: "e1".to_owned(),
                event: SlackEvent::Unsupported { event_type: "slash_commands".to_owned() },
            })
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(parse_socket_frame("not json").is_err());
    }
}
