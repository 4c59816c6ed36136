//! WebSocket session actor.
//!
//! One actor per accepted connection. The actor drains the registry link's
//! receiver into the socket, answers protocol pings, and removes its link
//! from the registry when it stops for any reason.

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::messages::Envelope;
use super::registry::{ConnectionId, ConnectionRegistry};

/// How often the server pings the client
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Close the session after this long without a pong
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope handed to the session actor for writing to the socket
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Deliver(Envelope);

/// WebSocket session actor for one user connection
pub struct WsSession {
    user_id: Uuid,
    connection_id: ConnectionId,
    registry: ConnectionRegistry,
    /// Taken by `started` to spawn the forwarder
    rx: Option<UnboundedReceiver<Envelope>>,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        user_id: Uuid,
        connection_id: ConnectionId,
        registry: ConnectionRegistry,
        rx: UnboundedReceiver<Envelope>,
    ) -> Self {
        Self {
            user_id,
            connection_id,
            registry,
            rx: Some(rx),
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(
                    user_id = %act.user_id,
                    "WebSocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            user_id = %self.user_id,
            connection_id = ?self.connection_id,
            "WebSocket session started"
        );

        self.hb(ctx);

        // Drain the registry link into the socket. The loop ends when the
        // registry drops the link's sender (disconnect or prune).
        if let Some(mut rx) = self.rx.take() {
            let addr = ctx.address();
            tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    addr.do_send(Deliver(envelope));
                }
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            user_id = %self.user_id,
            connection_id = ?self.connection_id,
            "WebSocket session stopped"
        );

        let registry = self.registry.clone();
        let connection_id = self.connection_id;
        actix::spawn(async move {
            registry.disconnect(connection_id).await;
        });
    }
}

impl Handler<Deliver> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) {
        match msg.0.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => {
                tracing::error!(
                    user_id = %self.user_id,
                    error = %e,
                    "failed to serialize envelope for delivery"
                );
            }
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                // Delivery is one-way; inbound text is read and dropped.
                tracing::debug!(
                    user_id = %self.user_id,
                    len = text.len(),
                    "ignoring inbound websocket text"
                );
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(
                    user_id = %self.user_id,
                    reason = ?reason,
                    "WebSocket close message received"
                );
                ctx.stop();
            }
            _ => {}
        }
    }
}
