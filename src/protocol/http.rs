// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport backed by reqwest.

use std::time::Duration;

use reqwest::Client;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::protocol::{Request, Response, Transport};
use crate::types::AuthToken;

/// HTTP transport for the Blynk cloud API.
///
/// Holds one pooled reqwest client; sockets are released when the
/// transport is dropped.
///
/// # Examples
///
/// ```no_run
/// use windmill_fan::config::ClientConfig;
/// use windmill_fan::protocol::{HttpTransport, Request, Transport};
/// use windmill_fan::types::AuthToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new(&ClientConfig::default())?;
/// let token = AuthToken::new("my-device-token")?;
/// let response = transport
///     .request(&Request::get("external/api/get").flag("V0"), &token)
///     .await?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
            timeout: config.timeout(),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, request: &Request, token: &str) -> String {
        format!(
            "{}/{}?{}",
            self.base_url,
            request.path().trim_start_matches('/'),
            request.query_string(token)
        )
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        // reqwest errors embed the URL, which carries the token
        let err = err.without_url();
        if err.is_timeout() {
            // Timeouts are seconds, never near u64::MAX ms
            #[allow(clippy::cast_possible_truncation)]
            let ms = self.timeout.as_millis() as u64;
            TransportError::Timeout(ms)
        } else if err.is_decode() || err.is_body() {
            TransportError::MalformedResponse(err.to_string())
        } else if err.is_builder() || err.is_redirect() {
            // Misconfiguration, retrying cannot help
            TransportError::Client(err)
        } else {
            TransportError::ConnectionFailed(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    async fn request(
        &self,
        request: &Request,
        token: &AuthToken,
    ) -> Result<Response, TransportError> {
        let url = self.build_url(request, token.expose());

        tracing::debug!(
            method = %request.method(),
            url = %self.build_url(request, &token.redacted()),
            "Sending HTTP request"
        );

        let mut builder = self.client.request(request.method().clone(), &url);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::debug!(status = status.as_u16(), body = %body, "Received HTTP response");

        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Response::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig::new().with_base_url(base_url)).unwrap()
    }

    #[test]
    fn build_url_joins_path() {
        let transport = transport("https://example.com/");
        let request = Request::get("/external/api/get").flag("V0");
        assert_eq!(
            transport.build_url(&request, "tok"),
            "https://example.com/external/api/get?token=tok&V0"
        );
    }

    #[test]
    fn build_url_with_value() {
        let transport = transport("http://127.0.0.1:9000");
        let request = Request::get("external/api/update").param("V2", "3");
        assert_eq!(
            transport.build_url(&request, "tok"),
            "http://127.0.0.1:9000/external/api/update?token=tok&V2=3"
        );
    }

    #[tokio::test]
    async fn url_without_scheme_is_not_transient() {
        let transport = transport("dashboard.windmillair.com");
        let token = AuthToken::new("secret-token-1234").unwrap();

        let err = transport
            .request(&Request::get("external/api/get").flag("V0"), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Client(_)));
        assert!(!err.to_string().contains("secret-token-1234"));
        assert!(!crate::error::DeviceError::from_transport(err).is_transient());
    }

    #[test]
    fn default_base_url() {
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();
        assert_eq!(transport.base_url(), "https://dashboard.windmillair.com");
    }
}
