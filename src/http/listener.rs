//! The HTTP listener.

use std::io;
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener as StdListener};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use futures::future::pending;
use hyper::Server;
use hyper::server::accept::Accept;
use hyper::service::{make_service_fn, service_fn};
use log::{debug, error, info};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use crate::config::Config;
use crate::error::ExitError;
use crate::metrics::HttpServerMetrics;
use crate::stage::StagedAssets;
use super::State;
use super::actions::ActionRegistry;


//------------ http_listener -------------------------------------------------

/// Creates the HTTP server.
///
/// Stages the web UI, binds the listening socket, and returns a handle for
/// controlling the running server together with the future that drives it.
/// The future keeps accepting connections until [`ServerHandle::stop`] is
/// called; each accepted connection is served independently and a failure
/// in one of them never terminates the loop.
///
/// Staging or binding failures are fatal: the server never reaches the
/// listening state and an error is returned instead.
pub fn http_listener(
    registry: ActionRegistry,
    config: &Config,
) -> Result<(ServerHandle, impl Future<Output = ()>), ExitError> {
    let assets = StagedAssets::prepare(&config.ui_dir)?;
    let state = Arc::new(State::new(registry, assets, config));

    // Binding happens synchronously so the caller learns about a busy
    // port before the future is first polled.
    let listener = match StdListener::bind(config.listen) {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                "Fatal: error listening on {}: {}", config.listen, err
            );
            return Err(ExitError::Generic);
        }
    };
    if let Err(err) = listener.set_nonblocking(true) {
        error!(
            "Fatal: error switching {} to nonblocking: {}",
            config.listen, err
        );
        return Err(ExitError::Generic);
    }
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => {
            error!("Fatal: cannot determine listen address: {}", err);
            return Err(ExitError::Generic);
        }
    };

    let (tx, rx) = oneshot::channel();
    let handle = ServerHandle {
        addr,
        stop: Arc::new(Mutex::new(Some(tx))),
        metrics: state.metrics().clone(),
    };
    info!("HTTP server up and running on {}", addr);
    Ok((handle, single_http_listener(listener, state, rx)))
}

/// Returns the future for the single HTTP listener.
///
/// The future resolves once the server was told to stop. A stop while an
/// accept is pending simply ends the accepting quietly; it is the one
/// expected way for the loop to finish.
async fn single_http_listener(
    listener: StdListener,
    state: Arc<State>,
    stop: oneshot::Receiver<()>,
) {
    let metrics = state.metrics().clone();
    let make_service = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = state.clone();
                async move {
                    Ok::<_, Infallible>(
                        super::handle_request(req, &state).await
                    )
                }
            }))
        }
    });
    let listener = HttpAccept {
        sock: match TcpListener::from_std(listener) {
            Ok(listener) => listener,
            Err(err) => {
                error!("Failed on HTTP listener: {}", err);
                return
            }
        },
        metrics,
    };
    let server = Server::builder(listener)
        .serve(make_service)
        .with_graceful_shutdown(async move {
            if stop.await.is_ok() {
                debug!("HTTP server stopping");
            }
            else {
                // The handle is gone but nobody asked for a stop. Keep
                // serving.
                pending::<()>().await
            }
        });
    if let Err(err) = server.await {
        error!("HTTP server error: {}", err);
    }
}


//------------ ServerHandle --------------------------------------------------

/// A handle to a running HTTP server.
///
/// The handle can be cloned and shared freely.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    /// The address the server is listening on.
    addr: SocketAddr,

    /// The stop trigger, taken on the first stop.
    stop: Arc<Mutex<Option<oneshot::Sender<()>>>>,

    /// The server’s activity counters.
    metrics: Arc<HttpServerMetrics>,
}

impl ServerHandle {
    /// Returns the address the server actually listens on.
    ///
    /// This differs from the configured address when port zero was
    /// requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the server’s activity counters.
    pub fn metrics(&self) -> &HttpServerMetrics {
        &self.metrics
    }

    /// Stops the server.
    ///
    /// The listening socket is closed and the server future resolves once
    /// requests in flight have been answered. Calling this more than once
    /// is fine; later calls do nothing.
    pub fn stop(&self) {
        let tx = self.stop.lock().expect("poisoned lock").take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}


//------------ HttpAccept ----------------------------------------------------

/// The wrapped listening socket.
///
/// Accepted connections are handed out wrapped in [`HttpStream`] so their
/// traffic shows up in the metrics. An accept failure is logged and the
/// socket polled again right away; it never reaches the server machinery
/// and thus can never end the accept loop.
struct HttpAccept {
    sock: TcpListener,
    metrics: Arc<HttpServerMetrics>,
}

impl Accept for HttpAccept {
    type Conn = HttpStream;
    type Error = io::Error;

    fn poll_accept(
        self: Pin<&mut Self>,
        cx: &mut Context
    ) -> Poll<Option<Result<Self::Conn, Self::Error>>> {
        loop {
            match self.sock.poll_accept(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok((sock, _addr))) => {
                    self.metrics.inc_conn_open();
                    return Poll::Ready(Some(Ok(HttpStream {
                        sock,
                        metrics: self.metrics.clone()
                    })))
                }
                Poll::Ready(Err(err)) => {
                    error!("Failed to accept HTTP connection: {}", err);
                }
            }
        }
    }
}


//------------ HttpStream ----------------------------------------------------

/// An accepted connection that counts its traffic.
struct HttpStream {
    sock: TcpStream,
    metrics: Arc<HttpServerMetrics>,
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>, cx: &mut Context, buf: &mut ReadBuf
    ) -> Poll<Result<(), io::Error>> {
        let len = buf.filled().len();
        let res = Pin::new(&mut self.sock).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = res {
            self.metrics.inc_bytes_read(
                (buf.filled().len().saturating_sub(len)) as u64
            )
        }
        res
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>, cx: &mut Context, buf: &[u8]
    ) -> Poll<Result<usize, io::Error>> {
        let res = Pin::new(&mut self.sock).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            self.metrics.inc_bytes_written(n as u64)
        }
        res
    }

    fn poll_flush(
        mut self: Pin<&mut Self>, cx: &mut Context
    ) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.sock).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>, cx: &mut Context
    ) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.sock).poll_shutdown(cx)
    }
}

impl Drop for HttpStream {
    fn drop(&mut self) {
        self.metrics.inc_conn_close()
    }
}
