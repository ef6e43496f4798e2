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
//! Import a Server Configuration Profile (SCP) onto a Dell iDRAC over Redfish.
//!
//! [`IdracConnection`] opens (or adopts) a session, [`import_server_config_profile`] runs the
//! import and folds the iDRAC's answer into an [`ImportOutcome`].
use std::fmt;

pub mod args;
pub mod connection;
mod dell;
mod error;
pub mod import;
mod jsonmap;
pub mod model;
mod network;
pub mod share;

pub use args::ModuleArgs;
pub use connection::IdracConnection;
pub use error::{ConnectionError, RedfishError};
pub use import::{import_server_config_profile, FailureKind, ImportOutcome, ModuleResult};
pub use model::oem::dell::{HostPowerState, ScpTarget, ShutdownType};
pub use network::{Endpoint, JobSettings, RedfishClientPool, RedfishClientPoolBuilder};
pub use share::{FileShare, ScpFile, ShareCredentials, ShareError, ShareLocation};

/// Raw answer of an import, e.g. `{"Status": "Success", "Message": "Job created", "JobId": ..}`.
pub type ScpResponse = serde_json::Map<String, serde_json::Value>;

/// Interface to an authenticated iDRAC session. All calls except
/// [`Idrac::liaison_share`] include one or more HTTP network calls.
pub trait Idrac: Send + Sync {
    /// Import a Server Configuration Profile. With `job_wait` this blocks until the
    /// iDRAC job finishes.
    fn import_scp(&self, request: &ScpImportRequest) -> Result<ScpResponse, RedfishError>;

    /// Make `share` the session's working file location.
    fn set_liaison_share(&self, share: FileShare) -> Result<(), RedfishError>;

    /// The share set by [`Idrac::set_liaison_share`], if any.
    fn liaison_share(&self) -> Option<FileShare>;

    /// End the session on the BMC.
    fn logout(&self) -> Result<(), RedfishError>;
}

/// Everything the iDRAC needs to run one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpImportRequest {
    pub file: ScpFile,
    pub target: ScpTarget,
    pub shutdown_type: ShutdownType,
    pub end_host_power_state: HostPowerState,
    pub job_wait: bool,
}

/// The Status field of an [`ScpResponse`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ScpStatus {
    Success,
    Failed,
    Other(String),
}

impl ScpStatus {
    pub fn parse(s: &str) -> ScpStatus {
        match s {
            "Success" => ScpStatus::Success,
            "Failed" => ScpStatus::Failed,
            other => ScpStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ScpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScpStatus::Other(s) => f.write_str(s),
            _ => fmt::Debug::fmt(self, f),
        }
    }
}
