use hyper::header::{HeaderValue, CONNECTION, CONTENT_TYPE, UPGRADE};
use hyper::{Body, Request, Response};

pub fn apply_content_type(response: &mut Response<Body>) {
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
}

fn header_contains(req: &Request<Body>, name: hyper::header::HeaderName, token: &str) -> bool {
    req.headers()
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

pub fn is_websocket_upgrade(req: &Request<Body>) -> bool {
    header_contains(req, UPGRADE, "websocket") && header_contains(req, CONNECTION, "upgrade")
}
