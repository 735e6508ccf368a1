//! MQTT dialogue binding — Hermes-style topics over rumqttc.
//!
//! [`MqttDialogue::connect`] builds the client and queues the intent
//! subscription; [`run`] drives the connection's event loop, decoding each
//! intent publish and handing it to the dispatcher synchronously — the next
//! event is not polled until the handler returns.
//!
//! Outbound operations use `try_publish`, so handlers stay plain synchronous
//! functions; the queued publishes are flushed by the same event loop.
//!
//! Any connection-level error from the event loop (including the initial
//! connect) propagates to the caller and takes the process down.  Restart
//! is an operational concern, not a programmatic one.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::AppError;

use super::DialogueApi;
use super::IntentMessage;

/// Topic filter for all recognized-intent events.
const INTENT_TOPIC_FILTER: &str = "hermes/intent/#";
const END_SESSION_TOPIC: &str = "hermes/dialogueManager/endSession";
const START_SESSION_TOPIC: &str = "hermes/dialogueManager/startSession";

const KEEP_ALIVE: Duration = Duration::from_secs(30);

// ── wire payloads ────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndSessionPayload<'a> {
    session_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionPayload<'a> {
    site_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_data: Option<&'a str>,
    init: SessionInit<'a>,
}

#[derive(Serialize)]
struct SessionInit<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

// ── MqttDialogue ─────────────────────────────────────────────────────────────

/// Outbound handle to the dialogue bus.
///
/// Cheap to clone; handlers receive it as `&dyn DialogueApi`.
#[derive(Clone)]
pub struct MqttDialogue {
    client: AsyncClient,
}

impl MqttDialogue {
    /// Connect to the bus at `addr` (`host:port`) and queue the subscription
    /// for all recognized-intent events.
    ///
    /// Returns the outbound handle and the event loop the caller must drive
    /// via [`run`].  The TCP connection is only attempted once the event
    /// loop is polled, so an unreachable broker surfaces there.
    pub fn connect(addr: &str, client_id: &str) -> Result<(Self, EventLoop), AppError> {
        let (host, port) = split_addr(addr)?;
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, eventloop) = AsyncClient::new(options, 16);
        client
            .try_subscribe(INTENT_TOPIC_FILTER, QoS::AtMostOnce)
            .map_err(|e| AppError::Bus(format!("subscribe {INTENT_TOPIC_FILTER}: {e}")))?;

        Ok((Self { client }, eventloop))
    }

    fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| AppError::Bus(format!("encode {topic}: {e}")))?;
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, bytes)
            .map_err(|e| AppError::Bus(format!("publish {topic}: {e}")))
    }
}

impl DialogueApi for MqttDialogue {
    fn end_session(&self, session_id: &str, text: &str) -> Result<(), AppError> {
        self.publish(END_SESSION_TOPIC, &EndSessionPayload { session_id, text })
    }

    fn start_session_notification(
        &self,
        site_id: &str,
        text: &str,
        custom_data: Option<&str>,
    ) -> Result<(), AppError> {
        self.publish(
            START_SESSION_TOPIC,
            &StartSessionPayload {
                site_id,
                custom_data,
                init: SessionInit { kind: "notification", text },
            },
        )
    }
}

// ── run ──────────────────────────────────────────────────────────────────────

/// Drive the bus event loop until `shutdown` is cancelled.
///
/// Each intent publish is decoded into an [`IntentMessage`] and dispatched
/// before the next poll.  An undecodable payload is a per-event defect —
/// warned and skipped; a connection-level error is fatal and returned.
pub async fn run(
    mut eventloop: EventLoop,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(filter = INTENT_TOPIC_FILTER, "listening for intents");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received — leaving intent loop");
                return Ok(());
            }

            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!("connected to dialogue bus");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        match serde_json::from_slice::<IntentMessage>(&publish.payload) {
                            Ok(msg) => dispatcher.dispatch(&msg),
                            Err(e) => {
                                warn!(topic = %publish.topic, "undecodable intent payload: {e}");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(AppError::Bus(format!("connection failed: {e}")));
                    }
                }
            }
        }
    }
}

/// Split a `host:port` connection address.
fn split_addr(addr: &str) -> Result<(String, u16), AppError> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(AppError::Config(format!(
            "mqtt address {addr:?} is not of the form host:port"
        )));
    };
    if host.is_empty() {
        return Err(AppError::Config(format!("mqtt address {addr:?} has an empty host")));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| AppError::Config(format!("mqtt address {addr:?} has a bad port: {e}")))?;
    Ok((host.to_string(), port))
}
