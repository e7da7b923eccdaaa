use hyper::{Body, Response, StatusCode};

use crate::utils::*;

pub fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not found"));
    apply_content_type(&mut response);
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

pub fn bad_request(reason: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(reason));
    apply_content_type(&mut response);
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

pub fn bad_gateway() -> Response<Body> {
    let mut response = Response::new(Body::from("Bad gateway"));
    apply_content_type(&mut response);
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}
