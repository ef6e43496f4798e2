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
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum RedfishError {
    #[error("Could not build HTTP client. {0}")]
    ClientBuild(reqwest::Error),

    #[error("Network error talking to BMC at {url}. {source}")]
    NetworkError { url: String, source: reqwest::Error },

    #[error("HTTP {status_code} at {url}. {response_body}")]
    HTTPErrorCode {
        url: String,
        status_code: StatusCode,
        response_body: String,
    },

    #[error("Could not deserialize response from {url}. Body: {body}. {source}")]
    JsonDeserializeError {
        url: String,
        body: String,
        source: serde_json::Error,
    },

    #[error("Could not serialize request body for {url}. Obj: {object_debug}. {source}")]
    JsonSerializeError {
        url: String,
        object_debug: String,
        source: serde_json::Error,
    },

    #[error("Remote returned empty body")]
    NoContent,

    #[error("Missing key {key} in JSON at {url}")]
    MissingKey { key: String, url: String },

    #[error("Key {key} should be {expected_type} at {url}")]
    InvalidKeyType {
        key: String,
        expected_type: String,
        url: String,
    },

    #[error("Missing header {header} in response from {url}")]
    MissingHeader { header: String, url: String },

    #[error("BMC vendor {0} is not supported")]
    UnsupportedVendor(String),

    #[error("Job {job_id} did not finish within {timeout:?}, last state {last_state}")]
    JobTimeout {
        job_id: String,
        timeout: Duration,
        last_state: String,
    },

    #[error("Could not read {}. {source}", .path.display())]
    FileReadError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures establishing or using the session to the iDRAC.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("{0}")]
    Configuration(String),

    #[error("Could not initialize drivers. {0}")]
    DriverInit(RedfishError),

    #[error("Could not find device driver for iDRAC with IP Address: {0}")]
    DriverNotFound(String),

    #[error("{0}")]
    ShareMount(String),

    #[error(transparent)]
    Redfish(#[from] RedfishError),
}
