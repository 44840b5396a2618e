//! WebSocket accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use fleet_net::MachineMapClient;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::session::Session;

/// Accepts browser connections and runs one [`Session`] per connection.
pub struct BridgeServer {
    listener: TcpListener,
    client: MachineMapClient,
    path: Arc<str>,
}

impl BridgeServer {
    /// Bind the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns the bind error if the listen address is unavailable.
    pub async fn bind(config: &BridgeConfig, client: MachineMapClient) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.listen).await?;
        Ok(Self {
            listener,
            client,
            path: Arc::from(config.path.as_str()),
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires. Every session runs under a
    /// child token of `shutdown`.
    pub async fn run(self, shutdown: CancellationToken) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, path = %self.path, rpc_addr = self.client.addr(), "bridge listening");
        }

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        tokio::spawn(accept_session(
                            socket,
                            peer,
                            self.client.clone(),
                            Arc::clone(&self.path),
                            shutdown.child_token(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                },
            }
        }

        info!("bridge stopped accepting connections");
    }
}

async fn accept_session(
    socket: TcpStream,
    peer: SocketAddr,
    client: MachineMapClient,
    path: Arc<str>,
    cancel: CancellationToken,
) {
    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == &*path {
            Ok(response)
        } else {
            let body = format!("no endpoint at {}", request.uri().path());
            let mut rejection = ErrorResponse::new(Some(body));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let upgraded = tokio::select! {
        () = cancel.cancelled() => return,
        upgraded = tokio_tungstenite::accept_hdr_async(socket, check_path) => upgraded,
    };
    match upgraded {
        Ok(ws) => {
            let session = Session::new(peer, client, cancel);
            debug!(session = %session.id(), %peer, "websocket upgraded");
            session.run(ws).await;
        }
        Err(e) => warn!(%peer, error = %e, "failed to upgrade connection"),
    }
}
