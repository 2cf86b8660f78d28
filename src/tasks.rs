//! Background task owning a node's websocket.

use crate::{
    client::{Lavalink, LavalinkInner},
    constants::ABNORMAL_CLOSE_CODE,
    events::LavalinkEventHandler,
    id::GuildId,
    model::{IncomingMessage, NodeEvent, OutgoingMessage, TrackEndReason, WebSocketClosed},
    nodes::Advance,
    player::play_message,
    ws::{Error as WsError, WsStream},
};
use flume::Receiver;
use std::sync::{Arc, Weak};
use tokio::select;
use tracing::{debug, error, info, instrument, trace, warn};

/// Messages from client handles to the node runner.
#[derive(Debug)]
pub(crate) enum NodeMessage {
    /// Forward a command to the node.
    Command(OutgoingMessage),
    /// Close the socket and stop.
    Close,
}

pub(crate) struct NodeRunner {
    rx: Receiver<NodeMessage>,
    ws_client: WsStream,
    handler: Arc<dyn LavalinkEventHandler>,
    client: Weak<LavalinkInner>,
}

impl NodeRunner {
    pub(crate) fn new(
        rx: Receiver<NodeMessage>,
        ws_client: WsStream,
        handler: Arc<dyn LavalinkEventHandler>,
        client: Weak<LavalinkInner>,
    ) -> Self {
        Self {
            rx,
            ws_client,
            handler,
            client,
        }
    }

    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) {
        trace!("Node runner started.");

        loop {
            select! {
                inner_msg = self.rx.recv_async() => {
                    match inner_msg {
                        Ok(NodeMessage::Command(cmd)) => {
                            trace!("Sending {:?}", cmd);

                            if let Err(e) = self.ws_client.send_json(&cmd).await {
                                self.signal_closed(&e).await;
                                break;
                            }
                        },
                        Ok(NodeMessage::Close) | Err(flume::RecvError::Disconnected) => {
                            debug!("Closing node connection.");
                            drop(self.ws_client.close().await);
                            break;
                        },
                    }
                }
                ws_msg = self.ws_client.recv_json_no_timeout() => {
                    match ws_msg {
                        Ok(Some(msg)) => {
                            let client = match self.client() {
                                Some(c) => c,
                                None => break,
                            };

                            process_ws(&client, &*self.handler, msg).await;
                        },
                        Ok(None) => {},
                        Err(e) => {
                            self.signal_closed(&e).await;
                            break;
                        },
                    }
                }
            }
        }

        trace!("Node runner finished.");
    }

    fn client(&self) -> Option<Lavalink> {
        self.client.upgrade().map(Lavalink::from_inner)
    }

    async fn signal_closed(&self, e: &WsError) {
        error!("Node connection terminated: {:?}", e);

        let event = match e {
            WsError::WsClosed(Some(frame)) => WebSocketClosed {
                guild_id: None,
                code: frame.code.into(),
                reason: frame.reason.to_string(),
                by_remote: true,
            },
            e => WebSocketClosed {
                guild_id: None,
                code: ABNORMAL_CLOSE_CODE,
                reason: format!("{:?}", e),
                by_remote: matches!(e, WsError::WsClosed(None)),
            },
        };

        if let Some(client) = self.client() {
            self.handler.websocket_closed(client, event).await;
        }
    }
}

/// Delivers one frame to the handler, advancing a looping guild's queue
/// first when a track finishes.
pub(crate) async fn process_ws(client: &Lavalink, handler: &dyn LavalinkEventHandler, msg: IncomingMessage) {
    let client = client.clone();

    match msg {
        IncomingMessage::Stats(ev) => handler.stats(client, ev).await,
        IncomingMessage::PlayerUpdate(ev) => handler.player_update(client, ev).await,
        IncomingMessage::Event(NodeEvent::TrackStart(ev)) => handler.track_start(client, ev).await,
        IncomingMessage::Event(NodeEvent::TrackFinish(ev)) => {
            if ev.reason != TrackEndReason::Replaced {
                client.inner.nodes.settle(ev.guild_id, &ev.track);
            }

            if ev.reason.may_start_next() {
                advance_queue(&client, &ev.track, ev.guild_id).await;
            }

            handler.track_finish(client, ev).await;
        },
        IncomingMessage::Event(NodeEvent::TrackException(ev)) =>
            handler.track_exception(client, ev).await,
        IncomingMessage::Event(NodeEvent::TrackStuck(ev)) => handler.track_stuck(client, ev).await,
        IncomingMessage::Event(NodeEvent::WebSocketClosed(ev)) =>
            handler.websocket_closed(client, ev).await,
        IncomingMessage::Event(NodeEvent::PlayerDestroyed(ev)) =>
            handler.player_destroyed(client, ev).await,
        IncomingMessage::Event(NodeEvent::Unknown) => warn!("Unrecognised event type from node."),
        IncomingMessage::Unknown => warn!("Unrecognised op from node."),
    }
}

async fn advance_queue(client: &Lavalink, finished: &str, guild_id: GuildId) {
    match client.inner.nodes.advance(guild_id, finished) {
        Advance::Next(next) => {
            info!("Advancing queue in {}.", guild_id);

            if client.require_session(guild_id).is_err() {
                debug!("No session in {}, not starting next track.", guild_id);
                return;
            }

            if let Err(e) = client.send(play_message(guild_id, &next, false)).await {
                warn!("Failed to start next track in {}: {}", guild_id, e);
            }
        },
        Advance::Exhausted => debug!("Queue in {} finished.", guild_id),
        Advance::NotHead | Advance::NotLooping => {},
    }
}
