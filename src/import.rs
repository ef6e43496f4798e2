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
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    jsonmap, share::ShareError, Idrac, ModuleArgs, RedfishError, ScpImportRequest,
    ScpResponse, ScpStatus,
};

/// Message the iDRAC gives when the profile matched the current configuration.
pub const NO_CHANGES_APPLIED: &str = "No changes were applied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The import ran and the iDRAC reported a status other than Success.
    Remote,
    /// The import could not be run or its result could not be read.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Success { changed: bool, msg: Value },
    Failure { kind: FailureKind, msg: Value },
}

impl ImportOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ImportOutcome::Success { changed: true, .. })
    }

    pub fn failed(&self) -> bool {
        matches!(self, ImportOutcome::Failure { .. })
    }

    /// The operation itself failed, as opposed to the iDRAC reporting a failure.
    pub fn errored(&self) -> bool {
        matches!(
            self,
            ImportOutcome::Failure {
                kind: FailureKind::Error,
                ..
            }
        )
    }

    pub fn msg(&self) -> &Value {
        match self {
            ImportOutcome::Success { msg, .. } | ImportOutcome::Failure { msg, .. } => msg,
        }
    }

    pub fn into_result(self) -> ModuleResult {
        let changed = self.changed();
        let failed = self.failed();
        let msg = match self {
            ImportOutcome::Success { msg, .. } | ImportOutcome::Failure { msg, .. } => msg,
        };
        ModuleResult {
            changed,
            failed,
            msg,
        }
    }
}

/// What the module prints: `{"changed": .., "failed": .., "msg": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: Value,
}

impl ModuleResult {
    pub fn failure(msg: impl Into<String>) -> ModuleResult {
        ModuleResult {
            changed: false,
            failed: true,
            msg: Value::String(msg.into()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum ImportError {
    #[error(transparent)]
    Share(#[from] ShareError),

    #[error(transparent)]
    Redfish(#[from] RedfishError),
}

/// A dry run assumes the import would change the host.
pub fn check_mode_outcome() -> ImportOutcome {
    ImportOutcome::Success {
        changed: true,
        msg: json!({}),
    }
}

/// Import the profile named by `args` onto the iDRAC behind `idrac`.
///
/// In check mode nothing is sent and the run is reported as changed.
pub fn import_server_config_profile(
    idrac: &dyn Idrac,
    args: &ModuleArgs,
    check_mode: bool,
) -> ImportOutcome {
    if check_mode {
        info!("Check mode, not importing {}", args.scp_file);
        return check_mode_outcome();
    }

    match run_import(idrac, args) {
        Ok(response) => outcome_from_response(response),
        Err(err) => {
            warn!("Import failed: {err}");
            ImportOutcome::Failure {
                kind: FailureKind::Error,
                msg: Value::String(format!("Error: {err}")),
            }
        }
    }
}

fn run_import(idrac: &dyn Idrac, args: &ModuleArgs) -> Result<ScpResponse, ImportError> {
    // A share bound by IdracConnection::mount_share wins over resolving it again
    let share = match idrac.liaison_share() {
        Some(share) => share,
        None => args.file_share()?,
    };
    let request = ScpImportRequest {
        file: share.new_file(&args.scp_file),
        target: args.scp_components,
        shutdown_type: args.shutdown_type,
        end_host_power_state: args.end_host_power_state,
        job_wait: args.job_wait,
    };
    info!(
        "Importing {} (target {}, shutdown {}, end power state {}, wait {})",
        request.file,
        request.target,
        request.shutdown_type,
        request.end_host_power_state,
        request.job_wait
    );
    Ok(idrac.import_scp(&request)?)
}

/// Fold the iDRAC's answer into an outcome. A response without a Status is left unchanged;
/// a Status that is anything but the string "Success" is a remote failure.
pub fn outcome_from_response(response: ScpResponse) -> ImportOutcome {
    let status = response.get("Status").map(|status| match status {
        Value::String(s) => ScpStatus::parse(s),
        other => ScpStatus::Other(other.to_string()),
    });
    match status {
        Some(ScpStatus::Success) => {
            let changed = !jsonmap::opt_str(&response, "Message")
                .unwrap_or_default()
                .contains(NO_CHANGES_APPLIED);
            ImportOutcome::Success {
                changed,
                msg: Value::Object(response),
            }
        }
        Some(status) => {
            warn!("iDRAC reported status {status}");
            ImportOutcome::Failure {
                kind: FailureKind::Remote,
                msg: Value::Object(response),
            }
        }
        None => ImportOutcome::Success {
            changed: false,
            msg: Value::Object(response),
        },
    }
}
