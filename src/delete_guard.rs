//! Idempotent delete classification.
//!
//! A delete that comes back 404 means the token is already gone, which is
//! the end state the caller asked for.

use reqwest::StatusCode;

use crate::client::ResponseResult;

/// Anything that carries an HTTP status code.
pub trait HasStatusCode {
    fn status_code(&self) -> u16;
}

impl HasStatusCode for StatusCode {
    fn status_code(&self) -> u16 {
        self.as_u16()
    }
}

impl HasStatusCode for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl HasStatusCode for ResponseResult {
    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// True only when a response exists and its status is 404.
/// No response at all (transport failure) is never treated as "not found".
pub fn is_not_found<R: HasStatusCode + ?Sized>(response: Option<&R>) -> bool {
    response.is_some_and(|r| r.status_code() == StatusCode::NOT_FOUND.as_u16())
}
