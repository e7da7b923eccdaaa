use hyper::{Body, Response};

use crate::monitor::Monitor;
use crate::utils::*;

/// Plain-text counters report.
pub fn stats(monitor: &Monitor) -> Response<Body> {
    let mut response = Response::new(Body::from(monitor.get_counters().to_string()));
    apply_content_type(&mut response);
    response
}
