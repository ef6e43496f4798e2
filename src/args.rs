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
//! Arguments of the import module, as written to the JSON argument file by the
//! configuration-management tool.
//!
//! Binary modules get the task arguments as given, so booleans and integers may arrive as
//! strings ("yes", "443"). Choice values are checked here; nothing past this point sees a
//! value outside the fixed sets.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer};

use crate::model::oem::dell::{HostPowerState, ScpTarget, ShutdownType};
use crate::network::Endpoint;
use crate::share::{FileShare, ShareError};

pub const DEFAULT_IDRAC_PORT: u16 = 443;

#[derive(thiserror::Error, Debug)]
pub enum ArgsError {
    #[error("Could not read argument file {}. {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid module arguments. {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize, Clone)]
pub struct ModuleArgs {
    pub idrac_ip: String,
    pub idrac_user: String,
    pub idrac_pwd: String,
    #[serde(default = "default_idrac_port", deserialize_with = "lenient_port")]
    pub idrac_port: u16,

    pub share_name: String,
    #[serde(default)]
    pub share_user: Option<String>,
    #[serde(default)]
    pub share_pwd: Option<String>,
    #[serde(default, deserialize_with = "expand_path")]
    pub share_mnt: Option<PathBuf>,

    pub scp_file: String,
    #[serde(default)]
    pub scp_components: ScpTarget,
    #[serde(default)]
    pub end_host_power_state: HostPowerState,
    #[serde(default)]
    pub shutdown_type: ShutdownType,
    #[serde(default = "default_true", deserialize_with = "lenient_bool")]
    pub job_wait: bool,

    #[serde(
        default,
        rename = "_ansible_check_mode",
        deserialize_with = "lenient_bool"
    )]
    pub check_mode: bool,
}

impl ModuleArgs {
    pub fn from_json(s: &str) -> Result<ModuleArgs, ArgsError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<ModuleArgs, ArgsError> {
        let s = std::fs::read_to_string(path).map_err(|source| ArgsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ModuleArgs::from_json(&s)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.idrac_ip.clone(),
            port: Some(self.idrac_port),
            user: Some(self.idrac_user.clone()),
            password: Some(self.idrac_pwd.clone()),
        }
    }

    /// The share named by `share_name`, bound to `share_mnt` when one is given.
    pub fn file_share(&self) -> Result<FileShare, ShareError> {
        FileShare::from_parts(
            &self.share_name,
            self.share_user.as_deref(),
            self.share_pwd.as_deref(),
            self.share_mnt.as_deref(),
        )
    }
}

impl fmt::Debug for ModuleArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HIDDEN: &str = "********";
        f.debug_struct("ModuleArgs")
            .field("idrac_ip", &self.idrac_ip)
            .field("idrac_user", &self.idrac_user)
            .field("idrac_pwd", &HIDDEN)
            .field("idrac_port", &self.idrac_port)
            .field("share_name", &self.share_name)
            .field("share_user", &self.share_user)
            .field("share_pwd", &self.share_pwd.as_ref().map(|_| HIDDEN))
            .field("share_mnt", &self.share_mnt)
            .field("scp_file", &self.scp_file)
            .field("scp_components", &self.scp_components)
            .field("end_host_power_state", &self.end_host_power_state)
            .field("shutdown_type", &self.shutdown_type)
            .field("job_wait", &self.job_wait)
            .field("check_mode", &self.check_mode)
            .finish()
    }
}

fn default_idrac_port() -> u16 {
    DEFAULT_IDRAC_PORT
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    Int(i64),
    String(String),
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Int(1) => Ok(true),
        BoolOrString::Int(0) => Ok(false),
        BoolOrString::Int(i) => Err(de::Error::custom(format!("{i} is not a valid boolean"))),
        BoolOrString::String(s) => match s.to_lowercase().as_str() {
            "yes" | "on" | "1" | "true" | "y" | "t" => Ok(true),
            "no" | "off" | "0" | "false" | "n" | "f" => Ok(false),
            _ => Err(de::Error::custom(format!("{s} is not a valid boolean"))),
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    String(String),
}

fn lenient_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let port = match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(i) => i,
        IntOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("idrac_port {s} is not an integer")))?,
    };
    u16::try_from(port).map_err(|_| de::Error::custom(format!("idrac_port {port} is out of range")))
}

// `path` arguments get a leading ~ expanded, as the configuration-management tool would do.
fn expand_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let home = std::env::var_os("HOME").map(PathBuf::from);
    Ok(Some(match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(&raw),
    }))
}
