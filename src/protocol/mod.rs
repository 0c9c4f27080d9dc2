// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for the Blynk cloud API.
//!
//! A [`Transport`] issues exactly one authenticated request per call and
//! classifies failures into [`TransportError`]. It never retries; retry
//! policy belongs to the [`DeviceClient`](crate::DeviceClient).
//!
//! [`HttpTransport`] is the reqwest-backed implementation. Tests substitute
//! their own implementation of the trait.

mod http;

pub use http::HttpTransport;

use reqwest::Method;
use serde_json::Value;

use crate::error::TransportError;
use crate::types::AuthToken;

/// A single API request, without the auth token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, Option<String>)>,
    body: Option<Value>,
}

impl Request {
    /// Creates a GET request for a path relative to the base URL.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request for a path relative to the base URL.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Sets a JSON body, sent with a `Content-Type: application/json` header.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a `key=value` query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), Some(value.into())));
        self
    }

    /// Adds a bare `key` query parameter without a value.
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.query.push((key.into(), None));
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, Option<String>)] {
        &self.query
    }

    /// Returns the JSON body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Renders the encoded query string, starting with the token.
    pub(crate) fn query_string(&self, token: &str) -> String {
        let mut query = format!("token={}", urlencoding::encode(token));
        for (key, value) in &self.query {
            query.push('&');
            query.push_str(&urlencoding::encode(key));
            if let Some(value) = value {
                query.push('=');
                query.push_str(&urlencoding::encode(value));
            }
        }
        query
    }
}

/// Body of a successful API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    body: String,
}

impl Response {
    /// Creates a response with the given body.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::MalformedResponse` if the body is not valid
    /// JSON for the target type.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body)
            .map_err(|e| TransportError::MalformedResponse(format!("{e}: {}", self.body)))
    }
}

/// A pure I/O boundary to the device API.
///
/// Implementations may use `async fn`; the returned future must be `Send`
/// so coordinators can be driven from spawned tasks.
pub trait Transport {
    /// Sends one authenticated request.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on timeout, connection failure, non-success
    /// status or an unreadable body.
    fn request(
        &self,
        request: &Request,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_puts_token_first() {
        let request = Request::get("external/api/get").flag("V0").flag("V2");
        assert_eq!(request.query_string("abc"), "token=abc&V0&V2");
    }

    #[test]
    fn query_string_encodes_values() {
        let request = Request::get("external/api/update").param("V1", "a b");
        assert_eq!(
            request.query_string("tok/en"),
            "token=tok%2Fen&V1=a%20b"
        );
    }

    #[test]
    fn post_carries_json_body() {
        let request = Request::post("external/api/batch/update")
            .json(serde_json::json!({"V0": 1}));

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.body(), Some(&serde_json::json!({"V0": 1})));
        assert!(Request::get("external/api/get").body().is_none());
    }

    #[test]
    fn response_json() {
        let response = Response::new(r#"{"V0":1}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["V0"], 1);
    }

    #[test]
    fn response_json_malformed() {
        let response = Response::new("not json");
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(TransportError::MalformedResponse(_))));
    }
}
