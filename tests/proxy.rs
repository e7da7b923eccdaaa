use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use websocket_stat::endpoints::{request_router, AppState};
use websocket_stat::ws::handshake::generate_key_from;
use websocket_stat::ws::{encode_frame, Opcode};
use websocket_stat::{Config, Limits, LogTemplates, Monitor, TracingSink};

const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

// Websocket server that echoes every byte it receives.
async fn echo_upstream() -> SocketAddr {
    let service = make_service_fn(|_conn: &AddrStream| async {
        Ok::<_, Infallible>(service_fn(|mut req: Request<Body>| async move {
            let key = req.headers()["sec-websocket-key"].clone();
            let on_upgrade = hyper::upgrade::on(&mut req);
            tokio::spawn(async move {
                if let Ok(upgraded) = on_upgrade.await {
                    let (mut reader, mut writer) = tokio::io::split(upgraded);
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                }
            });
            Ok::<_, Infallible>(
                Response::builder()
                    .status(StatusCode::SWITCHING_PROTOCOLS)
                    .header("upgrade", "websocket")
                    .header("connection", "upgrade")
                    .header("sec-websocket-accept", generate_key_from(key.as_bytes()))
                    .body(Body::empty())
                    .unwrap(),
            )
        }))
    });
    let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(service);
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

async fn proxy(monitor: Arc<Monitor>, upstream: SocketAddr) -> SocketAddr {
    let config = Config {
        upstream: Some(upstream.to_string()),
        ..Config::default()
    };
    let state = AppState::new(monitor, config);
    let service = make_service_fn(move |conn: &AddrStream| {
        let remote_addr = conn.remote_addr();
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                request_router(req, state.clone(), remote_addr)
            }))
        }
    });
    let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(service);
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

async fn open_websocket(addr: SocketAddr) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /chat HTTP/1.1\r\nHost: {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        addr, KEY
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    (stream, String::from_utf8(head).unwrap())
}

fn monitor(limits: Limits) -> Arc<Monitor> {
    Arc::new(Monitor::new(LogTemplates::default(), Arc::new(TracingSink), limits))
}

#[tokio::test]
async fn proxied_frames_are_counted_both_ways() {
    let monitor = monitor(Limits::default());
    let upstream = echo_upstream().await;
    let proxy = proxy(Arc::clone(&monitor), upstream).await;

    let (mut stream, head) = open_websocket(proxy).await;
    assert!(head.starts_with("HTTP/1.1 101"), "{}", head);
    assert!(head.to_ascii_lowercase().contains(&generate_key_from(KEY.as_bytes()).to_ascii_lowercase()));

    let frame = encode_frame(Opcode::Text, b"hello", Some([1, 2, 3, 4]));
    stream.write_all(&frame[..3]).await.unwrap();
    stream.write_all(&frame[3..]).await.unwrap();
    let mut echoed = vec![0u8; frame.len()];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(echoed, frame);

    let snapshot = monitor.get_counters();
    assert_eq!(snapshot.active_connections, 1);
    assert_eq!(snapshot.inbound.frames, 1);
    assert_eq!(snapshot.inbound.payload_bytes, 5);
    assert_eq!(snapshot.inbound.raw_bytes, frame.len() as u64);
    assert_eq!(snapshot.outbound.frames, 1);
    assert_eq!(snapshot.outbound.raw_bytes, frame.len() as u64);

    drop(stream);
    for _ in 0..50 {
        if monitor.get_counters().active_connections == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(monitor.get_counters().active_connections, 0);
}

#[tokio::test]
async fn connection_limit_sends_try_again_later() {
    let monitor = monitor(Limits {
        max_connections: Some(1),
        ..Limits::default()
    });
    assert!(monitor.counters().try_connection_opened(None));
    let upstream = echo_upstream().await;
    let proxy = proxy(Arc::clone(&monitor), upstream).await;

    let (mut stream, head) = open_websocket(proxy).await;
    assert!(head.starts_with("HTTP/1.1 101"), "{}", head);
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert_eq!(rest[0], 0x88);
    assert_eq!(&rest[2..4], &1013u16.to_be_bytes());
    assert_eq!(&rest[4..], b"Try Again Later");
    assert_eq!(monitor.get_counters().inbound.frames, 0);
}

#[tokio::test]
async fn aged_connection_is_closed_by_the_proxy() {
    let monitor = monitor(Limits {
        max_age: Some(Duration::from_millis(500)),
        ..Limits::default()
    });
    let upstream = echo_upstream().await;
    let proxy = proxy(Arc::clone(&monitor), upstream).await;

    let (mut stream, head) = open_websocket(proxy).await;
    assert!(head.starts_with("HTTP/1.1 101"), "{}", head);

    let frame = encode_frame(Opcode::Text, b"hi", Some([1, 2, 3, 4]));
    stream.write_all(&frame).await.unwrap();
    let mut echoed = vec![0u8; frame.len()];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(echoed, frame);

    tokio::time::sleep(Duration::from_millis(700)).await;
    stream.write_all(&frame).await.unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();

    let mut expected = vec![0x88, 20];
    expected.extend_from_slice(&4001u16.to_be_bytes());
    expected.extend_from_slice(b"Connection is Aged");
    assert_eq!(rest, expected);

    // the late frame was withheld from the counters and the upstream
    let snapshot = monitor.get_counters();
    assert_eq!(snapshot.inbound.frames, 1);
    assert_eq!(snapshot.outbound.frames, 1);

    for _ in 0..50 {
        if monitor.get_counters().active_connections == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(monitor.get_counters().active_connections, 0);
}
