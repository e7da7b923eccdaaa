use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join;
use hyper::header::{HeaderValue, HOST, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY};
use hyper::upgrade::Upgraded;
use hyper::{Body, Request, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::not_found::bad_request;
use super::tap::Tap;
use super::AppState;
use crate::context::RequestInfo;
use crate::error::{Result, StatError};
use crate::monitor::Connection;
use crate::utils::is_websocket_upgrade;
use crate::ws::consts::CLOSE_TRY_AGAIN_LATER;
use crate::ws::handshake::generate_key_from;
use crate::ws::{encode_close_frame, Direction};

const TRY_AGAIN_REASON: &str = "Try Again Later";

fn request_info(req: &Request<Body>, remote_addr: SocketAddr, state: &AppState) -> RequestInfo {
    RequestInfo {
        request: Some(format!("{} {} {:?}", req.method(), req.uri(), req.version())),
        uri: Some(req.uri().path().to_string()),
        remote_user: None,
        remote_addr: Some(remote_addr),
        server_addr: Some(state.config.listen),
        upstream_addr: state.config.upstream.clone(),
    }
}

fn upstream_request(req: &Request<Body>, upstream: &str) -> Result<Request<Body>> {
    let path = req
        .uri()
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or("/");
    let mut builder = Request::builder()
        .method(req.method())
        .uri(format!("http://{}{}", upstream, path));
    for (name, value) in req.headers() {
        if name != HOST {
            builder = builder.header(name, value);
        }
    }
    Ok(builder.header(HOST, upstream).body(Body::empty())?)
}

// The limit is reached: finish the handshake so the client can read the
// close status, then hang up.
fn reject(mut req: Request<Body>, key: &HeaderValue) -> Result<Response<Body>> {
    let sec_accept = generate_key_from(key.as_bytes());
    let on_upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(mut upgraded) => {
                let frame = encode_close_frame(CLOSE_TRY_AGAIN_LATER, TRY_AGAIN_REASON);
                if let Err(e) = upgraded.write_all(&frame).await {
                    debug!("error sending close frame: {}", e);
                }
                let _ = upgraded.shutdown().await;
            }
            Err(e) => debug!("upgrade error: {}", e),
        }
    });

    Ok(Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header("upgrade", "websocket")
        .header("connection", "upgrade")
        .header(SEC_WEBSOCKET_ACCEPT, sec_accept)
        .body(Body::empty())?)
}

async fn relay(client: Upgraded, upstream: Upgraded, connection: Arc<Connection>) -> Result<()> {
    connection.activate(Instant::now());
    let mut client = Tap::new(client, Direction::Inbound, Arc::clone(&connection));
    let mut upstream = Tap::new(upstream, Direction::Outbound, Arc::clone(&connection));

    let result = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;

    let close_frame = client
        .take_close_frame()
        .or_else(|| upstream.take_close_frame());
    if let Some(frame) = close_frame {
        client.get_mut().write_all(&frame).await?;
        let _ = client.get_mut().shutdown().await;
        let _ = upstream.get_mut().shutdown().await;
    } else if let Err(e) = result {
        debug!(connection_id = %connection.id(), "relay ended: {}", e);
    }
    connection.close(Instant::now());
    Ok(())
}

/// Proxy a websocket upgrade to the upstream and observe both directions.
pub async fn handle_ws(
    mut req: Request<Body>,
    state: AppState,
    remote_addr: SocketAddr,
) -> Result<Response<Body>> {
    if !is_websocket_upgrade(&req) {
        return Ok(bad_request("Expected a websocket upgrade"));
    }
    let key = match req.headers().get(SEC_WEBSOCKET_KEY) {
        Some(key) => key.clone(),
        None => return Err(StatError::MissingKey),
    };

    let info = request_info(&req, remote_addr, &state);
    // The slot is held from here; dropping `connection` on an early return
    // releases it.
    let connection = match state.monitor.open(info, Instant::now()) {
        Some(connection) => connection,
        None => {
            warn!(
                remote = %remote_addr,
                active = state.monitor.counters().active_connections(),
                "websocket connection limit reached"
            );
            return reject(req, &key);
        }
    };
    let upstream = state
        .config
        .upstream
        .as_deref()
        .ok_or_else(|| StatError::Upstream("no upstream configured".to_string()))?;
    let mut upstream_res = state.client.request(upstream_request(&req, upstream)?).await?;
    if upstream_res.status() != StatusCode::SWITCHING_PROTOCOLS {
        info!(status = %upstream_res.status(), "upstream declined the upgrade");
        return Ok(upstream_res);
    }

    let client_upgrade = hyper::upgrade::on(&mut req);
    let upstream_upgrade = hyper::upgrade::on(&mut upstream_res);
    tokio::spawn(async move {
        match try_join(client_upgrade, upstream_upgrade).await {
            Ok((client, upstream)) => {
                if let Err(e) = relay(client, upstream, connection).await {
                    debug!("error relaying websocket connection: {}", e);
                }
            }
            Err(e) => warn!(connection_id = %connection.id(), "upgrade error: {}", e),
        }
    });

    let mut response = Response::builder().status(StatusCode::SWITCHING_PROTOCOLS);
    for (name, value) in upstream_res.headers() {
        response = response.header(name, value);
    }
    Ok(response.body(Body::empty())?)
}
