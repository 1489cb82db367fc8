//! Socket server that runs on each worker node and dispatches incoming CSI
//! requests to the appropriate trait implementations.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, instrument, warn};

use crate::error::CsiError;
use crate::identity::CsiIdentity;
use crate::message::CsiMessage;
use crate::node::CsiNode;
use crate::transport::MAX_MESSAGE_SIZE;

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// A CSI server that accepts connections on a Unix socket and dispatches
/// [`CsiMessage`] requests to a [`CsiIdentity`] + [`CsiNode`]
/// implementation.
///
/// The socket file is removed when the server is dropped.
pub struct CsiServer<T> {
    listener: UnixListener,
    socket_path: PathBuf,
    handler: Arc<T>,
}

impl<T> CsiServer<T>
where
    T: CsiIdentity + CsiNode + 'static,
{
    /// Create a new server listening on `socket_path`.
    ///
    /// A socket file left behind by a previous run is removed first.
    pub fn bind(socket_path: impl Into<PathBuf>, handler: Arc<T>) -> Result<Self, CsiError> {
        let socket_path = socket_path.into();
        match std::fs::remove_file(&socket_path) {
            Ok(()) => debug!(socket = %socket_path.display(), "removed stale CSI socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(socket = %socket_path.display(), error = %e, "unable to remove CSI socket")
            }
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| {
            CsiError::TransportError(format!("unable to create CSI socket listener: {e}"))
        })?;
        info!(socket = %socket_path.display(), "CSI server listening");
        Ok(Self {
            listener,
            socket_path,
            handler,
        })
    }

    /// Accept connections in a loop until accepting fails permanently.
    ///
    /// Each accepted connection is handled on its own Tokio task. Temporary
    /// accept errors such as descriptor exhaustion are logged and retried
    /// after a backoff that doubles from 5ms up to 1s.
    pub async fn serve(&self) -> Result<(), CsiError> {
        let mut backoff = ACCEPT_BACKOFF_MIN;
        loop {
            let stream = match self.listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) if is_transient_accept_error(&e) => {
                    warn!(error = %e, retry_in = ?backoff, "CSI socket accept failed");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
                    continue;
                }
                Err(e) => return Err(CsiError::transport(e)),
            };
            backoff = ACCEPT_BACKOFF_MIN;

            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_stream(stream, &handler).await {
                    error!(error = %e, "CSI stream handler error");
                }
            });
        }
    }

    /// Serve until `shutdown` completes.
    ///
    /// Requests already being handled keep running on their own tasks; only
    /// the accept loop stops.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> Result<(), CsiError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.serve() => res,
            () = shutdown => {
                info!("CSI server shutting down");
                Ok(())
            }
        }
    }

    /// Process a single connection: read request → dispatch → write response.
    #[instrument(skip_all)]
    async fn handle_stream(mut stream: UnixStream, handler: &T) -> Result<(), CsiError> {
        // Read the full request.
        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_MESSAGE_SIZE)
            .read_to_end(&mut buf)
            .await
            .map_err(CsiError::transport)?;

        let request: CsiMessage = serde_json::from_slice(&buf)
            .map_err(|e| CsiError::TransportError(format!("malformed request: {e}")))?;

        debug!(%request, "CSI request received");

        let response = Self::dispatch(handler, request).await;

        // Serialize and send the response.
        let payload = serde_json::to_vec(&response).map_err(CsiError::internal)?;
        stream
            .write_all(&payload)
            .await
            .map_err(CsiError::transport)?;
        stream.shutdown().await.map_err(CsiError::transport)?;
        Ok(())
    }

    /// Map a [`CsiMessage`] request to the correct trait method call, wrap
    /// the result in a response [`CsiMessage`], and log the outcome.
    async fn dispatch(handler: &T, request: CsiMessage) -> CsiMessage {
        let Some(method) = request.method() else {
            warn!(msg = %request, "unexpected message variant received as request");
            return CsiMessage::Error(CsiError::InvalidArgument(format!(
                "unexpected message: {request}"
            )));
        };

        let response = match request {
            // --- Identity ---------------------------------------------------
            CsiMessage::GetPluginInfo => handler
                .get_plugin_info()
                .await
                .map(CsiMessage::PluginInfoResponse),
            CsiMessage::GetPluginCapabilities => handler
                .get_plugin_capabilities()
                .await
                .map(CsiMessage::PluginCapabilitiesResponse),
            CsiMessage::Probe => handler.probe().await.map(|()| CsiMessage::Ok),

            // --- Node -------------------------------------------------------
            CsiMessage::NodePublishVolume(req) => handler
                .publish_volume(req)
                .await
                .map(|()| CsiMessage::Ok),
            CsiMessage::NodeUnpublishVolume(req) => handler
                .unpublish_volume(req)
                .await
                .map(|()| CsiMessage::Ok),
            CsiMessage::NodeGetCapabilities => handler
                .get_capabilities()
                .await
                .map(CsiMessage::NodeCapabilitiesResponse),
            CsiMessage::NodeGetInfo => handler.get_info().await.map(CsiMessage::NodeInfoResponse),
            CsiMessage::NodeGetVolumeStats(req) => handler
                .get_volume_stats(req)
                .await
                .map(CsiMessage::VolumeStatsResponse),

            // `method()` is `Some` only for request variants.
            other => Err(CsiError::InvalidArgument(format!(
                "unexpected message: {other}"
            ))),
        };

        match response {
            Ok(msg) => {
                info!(method, "RPC succeeded");
                msg
            }
            Err(e) => {
                error!(method, error = %e, "RPC failed");
                CsiMessage::Error(e)
            }
        }
    }

    /// Path of the socket this server listens on.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl<T> Drop for CsiServer<T> {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(socket = %self.socket_path.display(), error = %e, "unable to remove CSI socket");
        }
    }
}

/// Whether an `accept` failure clears up on its own, so the listener stays
/// usable and the loop should retry.
fn is_transient_accept_error(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::ConnectionAborted
    ) {
        return true;
    }
    matches!(
        err.raw_os_error().map(Errno::from_raw),
        Some(
            Errno::EMFILE
                | Errno::ENFILE
                | Errno::ENOBUFS
                | Errno::ENOMEM
                | Errno::ECONNABORTED
                | Errno::ECONNRESET
                | Errno::EPROTO
                | Errno::EINTR
        )
    )
}
