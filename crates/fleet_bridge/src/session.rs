//! One bridged client connection.
//!
//! A session pairs an accepted WebSocket with one `Stream` call to the
//! machine server and walks `Connecting → Streaming → Closing → Closed`.
//! While streaming, a spawned task pumps machine states out to the client
//! and the session task itself reads control commands. Either side ending
//! cancels the session token, which unblocks the other; dropping the
//! stream call closes its connection so the server removes the machine.

use std::net::SocketAddr;
use std::sync::Arc;

use fleet_net::messages::MachineState;
use fleet_net::{MachineMapClient, MachineStream, NetError};
use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::outbound::Outbound;
use crate::protocol::{CommandError, ControlCommand, MachineView};

type Inbound = SplitStream<WebSocketStream<TcpStream>>;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, stream call not yet open.
    Connecting,
    /// States flow out, commands flow in.
    Streaming,
    /// One side has ended; waiting for the other to notice.
    Closing,
    /// Socket closed and stream call dropped.
    Closed,
}

/// A bridged client connection.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    peer: SocketAddr,
    client: MachineMapClient,
    cancel: CancellationToken,
    state: SessionState,
}

impl Session {
    /// Create a session for a client at `peer`. Cancelling `cancel` tears the
    /// session down.
    #[must_use]
    pub fn new(peer: SocketAddr, client: MachineMapClient, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            client,
            cancel,
            state: SessionState::Connecting,
        }
    }

    /// Returns the session identifier used in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Drive the session until either side disconnects.
    pub async fn run(mut self, socket: WebSocketStream<TcpStream>) {
        info!(session = %self.id, peer = %self.peer, "client connected");
        let (sink, inbound) = socket.split();
        let outbound = Arc::new(Outbound::new(sink));

        let opened = tokio::select! {
            () = self.cancel.cancelled() => None,
            opened = self.client.stream() => match opened {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!(session = %self.id, error = %e, "failed to start machine stream");
                    None
                }
            },
        };

        if let Some(stream) = opened {
            self.transition(SessionState::Streaming);
            let pump = tokio::spawn(pump_states(
                stream,
                Arc::clone(&outbound),
                self.cancel.clone(),
                self.id,
            ));

            self.read_commands(inbound, &outbound).await;

            self.transition(SessionState::Closing);
            self.cancel.cancel();
            if let Err(e) = pump.await {
                warn!(session = %self.id, error = %e, "state pump panicked");
            }
        } else {
            self.transition(SessionState::Closing);
        }

        outbound.close().await;
        self.transition(SessionState::Closed);
        info!(session = %self.id, peer = %self.peer, "client disconnected, cleaned up");
    }

    async fn read_commands(&self, mut inbound: Inbound, outbound: &Outbound) {
        loop {
            let message = tokio::select! {
                () = self.cancel.cancelled() => break,
                message = inbound.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    debug!(session = %self.id, "client closed the socket");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(session = %self.id, error = %e, "websocket read failed");
                    break;
                }
            };

            let command = match ControlCommand::decode(text.as_str()) {
                Ok(command) => command,
                Err(CommandError::UnknownType(kind)) => {
                    warn!(session = %self.id, kind = %kind, "unknown command type");
                    continue;
                }
                Err(e) => {
                    warn!(session = %self.id, error = %e, "ignoring command");
                    continue;
                }
            };

            let applied = tokio::select! {
                () = self.cancel.cancelled() => break,
                applied = self.apply(command) => applied,
            };
            let state = match applied {
                Ok(state) => state,
                Err(e) => {
                    if let Some(status) = e.status() {
                        warn!(session = %self.id, machine_id = command.id(), %status, "command rejected");
                    } else {
                        warn!(session = %self.id, machine_id = command.id(), error = %e, "command failed");
                    }
                    continue;
                }
            };

            match MachineView::from(state).to_json() {
                Ok(text) => {
                    if let Err(e) = outbound.send_text(text).await {
                        debug!(session = %self.id, error = %e, "failed to write confirmation");
                        break;
                    }
                }
                Err(e) => warn!(session = %self.id, error = %e, "failed to encode confirmation"),
            }
        }
    }

    async fn apply(&self, command: ControlCommand) -> Result<MachineState, NetError> {
        debug!(session = %self.id, ?command, "applying command");
        match command {
            ControlCommand::Pause { id } => self.client.pause(id).await,
            ControlCommand::Unpause { id } => self.client.unpause(id).await,
        }
    }
}

async fn pump_states(
    mut stream: MachineStream,
    outbound: Arc<Outbound>,
    cancel: CancellationToken,
    session: Uuid,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = stream.message() => next,
        };

        let state = match next {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(%session, "machine stream ended");
                break;
            }
            Err(e) => {
                warn!(%session, error = %e, "machine stream failed");
                break;
            }
        };

        let text = match MachineView::from(state).to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(%session, error = %e, "failed to encode state");
                continue;
            }
        };
        if let Err(e) = outbound.send_text(text).await {
            debug!(%session, error = %e, "failed to write state");
            break;
        }
    }
    cancel.cancel();
}
