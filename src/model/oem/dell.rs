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
//! Dell OEM vocabulary for `EID_674_Manager.ImportSystemConfiguration`.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which components of the profile to apply.
#[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScpTarget {
    #[default]
    All,
    Idrac,
    Bios,
    Nic,
    Raid,
}

impl fmt::Display for ScpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScpTarget::All => "ALL",
            ScpTarget::Idrac => "IDRAC",
            ScpTarget::Bios => "BIOS",
            ScpTarget::Nic => "NIC",
            ScpTarget::Raid => "RAID",
        };
        f.write_str(s)
    }
}

/// Host power state once the profile has been applied.
#[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum HostPowerState {
    #[default]
    On,
    Off,
}

impl fmt::Display for HostPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the host is taken down to apply the profile.
#[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum ShutdownType {
    #[default]
    Graceful,
    Forced,
    NoReboot,
}

impl fmt::Display for ShutdownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum ShareType {
    #[serde(rename = "CIFS")]
    Cifs,
    #[serde(rename = "NFS")]
    Nfs,
    Local,
}

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ShareParameters {
    pub target: ScpTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_type: Option<ShareType>,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workgroup: Option<String>,
}

// Share password must not reach the logs
impl fmt::Debug for ShareParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareParameters")
            .field("target", &self.target)
            .field("share_type", &self.share_type)
            .field("ip_address", &self.ip_address)
            .field("share_name", &self.share_name)
            .field("file_name", &self.file_name)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("workgroup", &self.workgroup)
            .finish()
    }
}

/// Body of the `ImportSystemConfiguration` action.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct SystemConfiguration {
    pub shutdown_type: ShutdownType,
    pub host_power_state: HostPowerState,
    pub share_parameters: ShareParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_buffer: Option<String>,
}

impl fmt::Debug for SystemConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemConfiguration")
            .field("shutdown_type", &self.shutdown_type)
            .field("host_power_state", &self.host_power_state)
            .field("share_parameters", &self.share_parameters)
            .field(
                "import_buffer",
                &self.import_buffer.as_ref().map(|b| format!("<{} bytes>", b.len())),
            )
            .finish()
    }
}
