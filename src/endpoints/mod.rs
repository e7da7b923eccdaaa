mod not_found;
mod stats;
mod tap;
mod ws;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Response};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::StatError;
use crate::monitor::Monitor;

pub use not_found::{bad_gateway, bad_request, not_found};
pub use stats::stats;
pub use tap::Tap;
pub use ws::handle_ws;

/// Shared by every request the server handles.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub config: Arc<Config>,
    pub client: Client<HttpConnector>,
}
impl AppState {
    pub fn new(monitor: Arc<Monitor>, config: Config) -> Self {
        AppState {
            monitor,
            config: Arc::new(config),
            client: Client::new(),
        }
    }
}

pub async fn request_router(
    req: Request<Body>,
    state: AppState,
    remote_addr: SocketAddr,
) -> Result<Response<Body>, Infallible> {
    debug!("req uri in endpoint {}", req.uri());
    if req.uri().path() == state.config.stat_path {
        return Ok(stats(&state.monitor));
    }
    if !crate::utils::is_websocket_upgrade(&req) {
        return Ok(not_found());
    }
    let response = match handle_ws(req, state, remote_addr).await {
        Ok(response) => response,
        Err(StatError::MissingKey) => bad_request("Missing Sec-WebSocket-Key header"),
        Err(e) => {
            warn!(remote = %remote_addr, "error proxying websocket: {}", e);
            bad_gateway()
        }
    };
    Ok(response)
}
