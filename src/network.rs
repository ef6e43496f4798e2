/*
 * SPDX-FileCopyrightText: Copyright (c) 2023 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */
use std::{fmt, time::Duration};

use reqwest::{
    blocking::Client as HttpClient, blocking::ClientBuilder as HttpClientBuilder,
    header::HeaderMap, header::HeaderValue, header::ACCEPT, header::CONTENT_TYPE, Method,
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::model::service_root::{RedfishVendor, ServiceRoot};
pub use crate::RedfishError;

pub const REDFISH_ENDPOINT: &str = "redfish/v1";
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// How a driver waits on iDRAC jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            poll_interval: DEFAULT_JOB_POLL_INTERVAL,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct RedfishClientPoolBuilder {
    timeout: Duration,
    accept_invalid_certs: bool,
    plain_http: bool,
    job_settings: JobSettings,
}

impl RedfishClientPoolBuilder {
    /// Prevents the Redfish Client from accepting self signed certificates
    /// and other invalid certificates.
    ///
    /// By default self signed certificates will be accepted, since BMCs usually
    /// use those.
    pub fn reject_invalid_certs(mut self) -> RedfishClientPoolBuilder {
        self.accept_invalid_certs = false;
        self
    }

    /// Talk plain HTTP instead of HTTPS. Only BMC emulators listen without TLS.
    pub fn plain_http(mut self) -> RedfishClientPoolBuilder {
        self.plain_http = true;
        self
    }

    /// Overwrites the timeout that will be applied to every request
    pub fn timeout(mut self, timeout: Duration) -> RedfishClientPoolBuilder {
        self.timeout = timeout;
        self
    }

    /// How often to check on a job while waiting for it
    pub fn job_poll_interval(mut self, interval: Duration) -> RedfishClientPoolBuilder {
        self.job_settings.poll_interval = interval;
        self
    }

    /// Give up waiting on a job after this long
    pub fn job_timeout(mut self, timeout: Duration) -> RedfishClientPoolBuilder {
        self.job_settings.timeout = timeout;
        self
    }

    /// Builds a Redfish Client Network Configuration
    pub fn build(&self) -> Result<RedfishClientPool, RedfishError> {
        let http_client = HttpClientBuilder::new()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .timeout(self.timeout)
            .build()
            .map_err(RedfishError::ClientBuild)?;
        Ok(RedfishClientPool {
            http_client,
            scheme: if self.plain_http { "http" } else { "https" },
            job_settings: self.job_settings,
        })
    }
}

/// The endpoint that the redfish client connects to
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    /// Hostname or IP address of BMC
    pub host: String,
    /// BMC port. If absent the default HTTPS port 443 will be used
    pub port: Option<u16>,
    /// BMC username
    pub user: Option<String>,
    /// BMC password
    pub password: Option<String>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RedfishClientPool {
    http_client: HttpClient,
    scheme: &'static str,
    job_settings: JobSettings,
}

impl RedfishClientPool {
    /// Returns Builder for configuring a Redfish HTTP connection pool
    pub fn builder() -> RedfishClientPoolBuilder {
        RedfishClientPoolBuilder {
            timeout: DEFAULT_TIMEOUT,
            // BMCs often have a self-signed cert, so usually this has to be true
            accept_invalid_certs: true,
            plain_http: false,
            job_settings: JobSettings::default(),
        }
    }

    /// Creates a Redfish BMC client for a certain endpoint
    ///
    /// Creating the client reads the service root to determine the BMC type, then
    /// logs in. Only Dell iDRACs are supported.
    pub fn create_client(
        &self,
        endpoint: Endpoint,
    ) -> Result<Box<dyn crate::Idrac>, RedfishError> {
        let client = RedfishHttpClient::new(self.http_client.clone(), self.scheme, endpoint);
        let (_status_code, root): (_, ServiceRoot) = client.get("")?;
        match root.vendor() {
            Some(RedfishVendor::Dell) => {
                info!(
                    "Found {} running Redfish {}",
                    root.product.as_deref().unwrap_or("Dell BMC"),
                    root.redfish_version
                );
                Ok(Box::new(crate::dell::Bmc::new(client, self.job_settings)?))
            }
            _ => Err(RedfishError::UnsupportedVendor(
                root.vendor_string().unwrap_or_else(|| "Unknown".to_string()),
            )),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
enum Auth {
    Basic,
    Token(String),
}

/// A HTTP client which targets a single BMC endpoint
pub struct RedfishHttpClient {
    endpoint: Endpoint,
    http_client: HttpClient,
    scheme: &'static str,
    auth: Auth,
}

impl RedfishHttpClient {
    pub fn new(http_client: HttpClient, scheme: &'static str, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            http_client,
            scheme,
            auth: Auth::Basic,
        }
    }

    /// Authenticate later requests with a Redfish session token instead of basic auth.
    pub fn set_session_token(&mut self, token: String) {
        self.auth = Auth::Token(token);
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn get<T>(&self, api: &str) -> Result<(StatusCode, T), RedfishError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
    {
        let (status_code, _headers, resp_opt) =
            self.req::<T, String>(Method::GET, api, None, true)?;
        match resp_opt {
            Some(response_body) => Ok((status_code, response_body)),
            None => Err(RedfishError::NoContent),
        }
    }

    /// POST bodies carry credentials (session login, share passwords) and are never logged.
    pub fn post<T, B>(
        &self,
        api: &str,
        data: B,
    ) -> Result<(StatusCode, HeaderMap, Option<T>), RedfishError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
        B: Serialize + ::std::fmt::Debug,
    {
        self.req(Method::POST, api, Some(data), false)
    }

    pub fn delete(&self, api: &str) -> Result<StatusCode, RedfishError> {
        let (status_code, _headers, _resp_body): (_, _, Option<serde_json::Value>) =
            self.req::<_, String>(Method::DELETE, api, None, true)?;
        Ok(status_code)
    }

    fn url(&self, api: &str) -> String {
        // IPv6 literals need brackets in a URL authority
        let host = &self.endpoint.host;
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.clone()
        };
        match self.endpoint.port {
            Some(p) => format!("{}://{}:{}/{}/{}", self.scheme, host, p, REDFISH_ENDPOINT, api),
            None => format!("{}://{}/{}/{}", self.scheme, host, REDFISH_ENDPOINT, api),
        }
    }

    // All the HTTP requests happen from here.
    pub fn req<T, B>(
        &self,
        method: Method,
        api: &str,
        body: Option<B>,
        log_body: bool,
    ) -> Result<(StatusCode, HeaderMap, Option<T>), RedfishError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
        B: Serialize + ::std::fmt::Debug,
    {
        let url = self.url(api);
        let body_enc = match body {
            Some(b) => {
                let url = url.clone();
                let body_enc =
                    serde_json::to_string(&b).map_err(|e| RedfishError::JsonSerializeError {
                        url,
                        object_debug: format!("{b:?}"),
                        source: e,
                    })?;
                Some(body_enc)
            }
            None => None,
        };
        if log_body {
            debug!(
                "TX {} {} {}",
                method,
                url,
                body_enc.as_deref().unwrap_or_default()
            );
        } else {
            debug!("TX {} {} <body not logged>", method, url);
        }

        let mut req_b = match method {
            Method::GET => self.http_client.get(&url),
            Method::POST => self.http_client.post(&url),
            Method::DELETE => self.http_client.delete(&url),
            _ => unreachable!("Only GET, POST and DELETE http methods are used."),
        };
        req_b = req_b
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match &self.auth {
            Auth::Token(token) => {
                req_b = req_b.header(AUTH_TOKEN_HEADER, token);
            }
            Auth::Basic => {
                if let Some(user) = &self.endpoint.user {
                    req_b = req_b.basic_auth(user, self.endpoint.password.as_ref());
                }
            }
        }
        if let Some(b) = body_enc {
            req_b = req_b.body(b);
        }
        let response = req_b.send().map_err(|e| RedfishError::NetworkError {
            url: url.clone(),
            source: e,
        })?;
        let status_code = response.status();
        let headers = response.headers().clone();
        // read the body even if not status 2XX, because BMCs give useful error messages as JSON
        let response_body = response.text().map_err(|e| RedfishError::NetworkError {
            url: url.clone(),
            source: e,
        })?;

        if !status_code.is_success() {
            debug!("RX {status_code} {response_body}");
            return Err(RedfishError::HTTPErrorCode {
                url,
                status_code,
                response_body: extended_error_message(&response_body),
            });
        }

        let mut res = None;
        if !response_body.is_empty() {
            debug!("RX {status_code} {response_body}");
            match serde_json::from_str(&response_body) {
                Ok(v) => res.insert(v),
                Err(e) => {
                    return Err(RedfishError::JsonDeserializeError {
                        url,
                        body: response_body,
                        source: e,
                    });
                }
            };
        } else {
            debug!("RX {status_code}");
        }
        Ok((status_code, headers, res))
    }
}

/// Turns a `Location` header (absolute URL or `/redfish/v1/...` path) into a path relative to
/// the Redfish root, as accepted by [`RedfishHttpClient`].
pub fn api_path(location: &str) -> String {
    let prefix = format!("/{REDFISH_ENDPOINT}/");
    match location.find(&prefix) {
        Some(idx) => location[idx + prefix.len()..].to_string(),
        None => location.trim_start_matches('/').to_string(),
    }
}

// Redfish error bodies look like {"error": {"@Message.ExtendedInfo": [{"Message": ".."}]}}.
// Pull the messages out; fall back to the raw body.
fn extended_error_message(body: &str) -> String {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    let messages: Vec<&str> = v
        .pointer("/error/@Message.ExtendedInfo")
        .and_then(|info| info.as_array())
        .map(|info| {
            info.iter()
                .filter_map(|m| m.get("Message").and_then(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default();
    if messages.is_empty() {
        v.pointer("/error/message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string())
    } else {
        messages.join(" ")
    }
}
