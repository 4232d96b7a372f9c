//! # Server
//!
//! Accept loop on a tokio runtime, one task per connection, one request
//! per connection.
//!
//! ## Failure Handling
//!
//! ```text
//! malformed / oversized request ──> 400 / 413, connection closed
//! read timeout                  ──> 408, connection closed
//! handler panic                 ──> 500, server keeps running
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ApiError, HttpError, ServerResult};
use crate::http::{read_request, write_response, Limits, Response};
use crate::lyrics::LyricsProvider;
use crate::routes::{route, AppState};
use crate::store::SubmissionStore;

/// A bound, not yet serving, HTTP server.
#[derive(Debug)]
pub struct Server<S, P> {
    listener: TcpListener,
    state: Arc<AppState<S, P>>,
    config: ServerConfig,
}

impl<S, P> Server<S, P>
where
    S: SubmissionStore,
    P: LyricsProvider,
{
    /// Binds the listen socket.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServerError::Io`] if the address cannot be bound,
    /// or [`crate::ServerError::Config`] if `config` is invalid.
    pub async fn bind(config: ServerConfig, store: S, lyrics: P) -> ServerResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind).await?;
        info!(addr = %listener.local_addr()?, "server listening");
        Ok(Self {
            listener,
            state: Arc::new(AppState::new(store, lyrics)),
            config,
        })
    }

    /// The bound address (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServerError::Io`] if the socket has no address.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handler state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState<S, P>> {
        Arc::clone(&self.state)
    }

    /// Serves until `shutdown` resolves.
    ///
    /// In-flight connections finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Never fails once bound; accept errors are logged and skipped.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let limits = Limits {
            max_head: self.config.max_head_bytes,
            max_body: self.config.max_body_bytes,
        };

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        let timeout = self.config.read_timeout();
                        tokio::spawn(async move {
                            let handled = handle_connection(stream, state, limits, timeout).await;
                            if let Err(err) = handled {
                                debug!(%peer, %err, "connection ended with error");
                            }
                        });
                    }
                    Err(err) => warn!(%err, "accept failed"),
                }
            }
        }
        Ok(())
    }
}

async fn handle_connection<S, P>(
    stream: TcpStream,
    state: Arc<AppState<S, P>>,
    limits: Limits,
    timeout: std::time::Duration,
) -> Result<(), HttpError>
where
    S: SubmissionStore,
    P: LyricsProvider,
{
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match tokio::time::timeout(timeout, read_request(&mut reader, limits)).await {
        Ok(Ok(Some(request))) => request,
        Ok(Ok(None)) => return Ok(()),
        Ok(Err(err)) => {
            let response = Response::error(&ApiError::from(&err));
            write_response(&mut write_half, &response).await?;
            return Err(err);
        }
        Err(_) => {
            let response = Response {
                status: 408,
                headers: Vec::new(),
                body: Vec::new(),
            };
            return write_response(&mut write_half, &response).await;
        }
    };

    let method = request.method.clone();
    let path = request.path.clone();

    // A separate task isolates handler panics from the connection.
    let handler = tokio::spawn(async move { route(&state, request).await });
    let response = match handler.await {
        Ok(response) => response,
        Err(err) if err.is_panic() => {
            error!(?method, %path, "handler panicked");
            Response::error(&ApiError::Internal)
        }
        Err(err) => {
            warn!(%err, "handler cancelled");
            Response::error(&ApiError::Internal)
        }
    };

    debug!(?method, %path, status = response.status, "request served");
    write_response(&mut write_half, &response).await
}
