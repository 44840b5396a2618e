//! RPC server: accepts call connections and dispatches them to the
//! [`MachineMapService`].
//!
//! A call connection carries exactly one request. For `Stream`, the request
//! half of the connection is watched while states are written; the peer
//! closing it cancels the call.

use std::net::SocketAddr;

use fleet_net::NetError;
use fleet_net::messages::{MachineState, Request, Response, RpcStatus, StatusCode};
use fleet_net::transport::{self, FrameReader, FrameWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::MachineMapService;

/// Accept call connections until `shutdown` fires.
///
/// Each connection runs on its own task with a child of `shutdown`, so
/// shutting down cancels every live stream.
pub async fn serve(listener: TcpListener, service: MachineMapService, shutdown: CancellationToken) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "machine server listening");
    }

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    let service = service.clone();
                    let cancel = shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, peer, service, cancel).await {
                            debug!(%peer, error = %e, "call ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            },
        }
    }

    info!("machine server stopped accepting calls");
}

async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    service: MachineMapService,
    cancel: CancellationToken,
) -> Result<(), NetError> {
    socket.set_nodelay(true)?;
    let (mut reader, mut writer) = transport::split(socket);

    let request = tokio::select! {
        () = cancel.cancelled() => return Ok(()),
        request = reader.recv::<Request>() => request,
    };
    let request = match request {
        Ok(Some(request)) => request,
        Ok(None) => {
            // A connectivity probe, or a client that gave up.
            debug!(%peer, "connection closed before a request arrived");
            return Ok(());
        }
        Err(NetError::Decode(e)) => {
            let status = RpcStatus::new(StatusCode::InvalidArgument, e.to_string());
            writer.send(&Response::Status(status)).await?;
            return writer.close().await;
        }
        Err(e) => return Err(e),
    };

    debug!(%peer, method = request.method(), "call received");
    match request {
        Request::Stream(_) => stream_call(reader, writer, service, cancel).await,
        Request::Pause(target) => {
            let response = respond(service.pause(target.id));
            writer.send(&response).await?;
            writer.close().await
        }
        Request::Unpause(target) => {
            let response = respond(service.unpause(target.id));
            writer.send(&response).await?;
            writer.close().await
        }
    }
}

fn respond(result: Result<MachineState, RpcStatus>) -> Response {
    match result {
        Ok(state) => Response::State(state),
        Err(status) => Response::Status(status),
    }
}

async fn stream_call(
    mut reader: FrameReader,
    mut writer: FrameWriter,
    service: MachineMapService,
    cancel: CancellationToken,
) -> Result<(), NetError> {
    let (tx, mut rx) = mpsc::channel(1);
    let producer = tokio::spawn({
        let cancel = cancel.clone();
        async move { service.stream(tx, cancel).await }
    });

    let result = loop {
        tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            // Clients send nothing after the request; any frame, EOF or
            // error on this half ends the call.
            _ = reader.recv::<Request>() => break Ok(()),
            state = rx.recv() => match state {
                Some(state) => {
                    if let Err(e) = writer.send(&Response::State(state)).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
        }
    };

    cancel.cancel();
    if let Ok(id) = producer.await {
        debug!(machine_id = id.0, "stream call finished");
    }
    result
}
