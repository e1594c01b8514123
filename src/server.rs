//! HTTP server implementation using hyper.
//!
//! The server only reads the request and hands it to [`Router::dispatch`];
//! every routing decision lives in the router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::{CONTENT_LENGTH, HeaderValue, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::response::{self, HttpResponse};
use crate::route::Route;
use crate::router::{self, Router};
use crate::table::{Matcher, Table};

/// Timeout for reading request headers (slowloris protection).
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause after a failed `accept` (e.g. out of file descriptors) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Shared server state.
pub struct State<M = Table<Route>> {
    pub config: Config,
    pub router: Arc<Router<M>>,
}

/// Handle to a running server instance.
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<crate::Result<()>>,
}

impl Server {
    /// The address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the accept loop and wait for it to finish.
    pub async fn shutdown(self) -> crate::Result<()> {
        let _ = self.shutdown_tx.send(());
        join_result(self.task.await)
    }
}

/// Flatten the accept-loop task result. A panicked or cancelled task is an
/// internal error, not a clean exit.
fn join_result(result: Result<crate::Result<()>, JoinError>) -> crate::Result<()> {
    result.map_err(|e| Error::Internal(format!("Server task failed: {e}")))?
}

/// Add default security headers unless the handler already set them.
fn add_standard_headers(response: &mut HttpResponse) {
    let headers = response.headers_mut();
    headers
        .entry(X_CONTENT_TYPE_OPTIONS)
        .or_insert(HeaderValue::from_static("nosniff"));
    headers
        .entry(X_FRAME_OPTIONS)
        .or_insert(HeaderValue::from_static("DENY"));
}

fn payload_too_large() -> HttpResponse {
    let mut response = response::error_body(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
    add_standard_headers(&mut response);
    response
}

/// Handle an incoming HTTP request.
async fn handle_request<M: Matcher<Route>>(
    req: Request<Incoming>,
    state: Arc<State<M>>,
) -> Result<HttpResponse, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let max_body_size = state.config.server.max_body_size;

    // Reject oversized bodies early via Content-Length header
    if let Some(len) = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        && len > max_body_size
    {
        return Ok(payload_too_large());
    }

    // Read body with size limit (fallback for chunked encoding)
    let body = match BodyExt::collect(Limited::new(body, max_body_size)).await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Ok(payload_too_large()),
    };

    let mut response = state
        .router
        .dispatch(router::Request::from_parts(parts, body))
        .await;
    add_standard_headers(&mut response);
    Ok(response)
}

fn service_unavailable() -> HttpResponse {
    let mut response =
        response::error_body(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    add_standard_headers(&mut response);
    response
}

/// Bind, start accepting connections, and return a handle.
///
/// The returned [`Server`] exposes the bound address and a
/// [`shutdown`](Server::shutdown) method for graceful termination.
pub async fn start<M>(config: Config, router: Arc<Router<M>>) -> crate::Result<Server>
where
    M: Matcher<Route> + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let semaphore = Arc::new(Semaphore::new(config.server.max_connections));
    let state = Arc::new(State { config, router });

    info!(routes = state.router.len(), "Server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tokio::pin!(shutdown_rx);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);

                    match semaphore.clone().try_acquire_owned() {
                        Ok(permit) => {
                            let state = Arc::clone(&state);
                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    handle_request(req, state)
                                });

                                let mut builder = auto::Builder::new(TokioExecutor::new());
                                builder.http1()
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(HEADER_READ_TIMEOUT);

                                if let Err(e) = builder.serve_connection(io, service).await {
                                    error!("Error serving connection from {}: {}", remote_addr, e);
                                }

                                drop(permit);
                            });
                        }
                        Err(_) => {
                            warn!("Connection limit reached, rejecting {}", remote_addr);
                            tokio::spawn(async move {
                                let service = service_fn(|_req: Request<Incoming>| async {
                                    Ok::<_, std::convert::Infallible>(service_unavailable())
                                });

                                let mut builder = auto::Builder::new(TokioExecutor::new());
                                builder.http1()
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(HEADER_READ_TIMEOUT);

                                let _ = builder.serve_connection(io, service).await;
                            });
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("Server on http://{} stopped accepting connections", addr);
                    break;
                }
            }
        }

        Ok(())
    });

    Ok(Server {
        addr,
        shutdown_tx,
        task,
    })
}

/// Run the HTTP server until the accept loop ends.
///
/// # Arguments
/// * `config` - Server configuration
/// * `router` - Router handle with registered routes
pub async fn run<M>(config: Config, router: Arc<Router<M>>) -> crate::Result<()>
where
    M: Matcher<Route> + 'static,
{
    let server = start(config, router).await?;
    join_result(server.task.await)
}
