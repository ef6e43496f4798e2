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
//! Where the Server Configuration Profile lives: a local directory, or a CIFS/NFS share the
//! iDRAC reads from directly.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::oem::dell::{ScpTarget, ShareParameters, ShareType};

#[derive(thiserror::Error, Debug)]
pub enum ShareError {
    #[error("share_name is empty")]
    Empty,

    #[error("Invalid CIFS share {0}, expected \\\\host\\share or //host/share")]
    InvalidCifs(String),

    #[error("Invalid NFS share {0}, expected host:/export")]
    InvalidNfs(String),

    #[error("Mount point {} does not exist", .0.display())]
    MountPointMissing(PathBuf),

    #[error("Mount point {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLocation {
    Local(PathBuf),
    Cifs { host: String, share: String },
    Nfs { host: String, export: String },
}

impl ShareLocation {
    /// Recognises `\\host\share`, `//host/share`, `host:/export`. Anything else is a local path.
    pub fn parse(share_name: &str) -> Result<ShareLocation, ShareError> {
        let share_name = share_name.trim();
        if share_name.is_empty() {
            return Err(ShareError::Empty);
        }

        if let Some(rest) = share_name
            .strip_prefix("\\\\")
            .or_else(|| share_name.strip_prefix("//"))
        {
            let mut parts = rest
                .split(['\\', '/'])
                .filter(|p| !p.is_empty());
            let host = parts.next();
            let share: Vec<&str> = parts.collect();
            return match host {
                Some(host) if !share.is_empty() => Ok(ShareLocation::Cifs {
                    host: host.to_string(),
                    share: share.join("/"),
                }),
                _ => Err(ShareError::InvalidCifs(share_name.to_string())),
            };
        }

        if !share_name.starts_with('/') && !share_name.starts_with('.') {
            if let Some((host, export)) = share_name.split_once(':') {
                // C:\profiles is a drive letter, not an NFS host
                let is_drive = host.len() == 1 && !export.starts_with('/');
                if !is_drive {
                    if host.is_empty() || !export.starts_with('/') {
                        return Err(ShareError::InvalidNfs(share_name.to_string()));
                    }
                    return Ok(ShareLocation::Nfs {
                        host: host.to_string(),
                        export: export.to_string(),
                    });
                }
            }
        }

        Ok(ShareLocation::Local(PathBuf::from(share_name)))
    }

    pub fn share_type(&self) -> ShareType {
        match self {
            ShareLocation::Local(_) => ShareType::Local,
            ShareLocation::Cifs { .. } => ShareType::Cifs,
            ShareLocation::Nfs { .. } => ShareType::Nfs,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ShareLocation::Local(_))
    }
}

impl fmt::Display for ShareLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareLocation::Local(p) => write!(f, "{}", p.display()),
            ShareLocation::Cifs { host, share } => write!(f, "//{host}/{share}"),
            ShareLocation::Nfs { host, export } => write!(f, "{host}:{export}"),
        }
    }
}

/// Credentials for a network share. `user@domain` is split into user and workgroup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ShareCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ShareCredentials {
    pub fn new(user: Option<&str>, password: Option<&str>) -> Option<ShareCredentials> {
        let user = user.filter(|u| !u.is_empty()).map(str::to_string);
        let password = password.filter(|p| !p.is_empty()).map(str::to_string);
        if user.is_none() && password.is_none() {
            return None;
        }
        Some(ShareCredentials { user, password })
    }

    fn user_and_workgroup(&self) -> (Option<String>, Option<String>) {
        match self.user.as_deref().and_then(|u| u.split_once('@')) {
            Some((user, domain)) if !domain.is_empty() => {
                (Some(user.to_string()), Some(domain.to_string()))
            }
            _ => (self.user.clone(), None),
        }
    }
}

impl fmt::Debug for ShareCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareCredentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// A resolved share, optionally bound to the local directory where it is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileShare {
    pub location: ShareLocation,
    pub creds: Option<ShareCredentials>,
    pub mount_point: Option<PathBuf>,
}

impl FileShare {
    /// Work out the share type from its name alone.
    pub fn resolve(
        share_name: &str,
        creds: Option<ShareCredentials>,
    ) -> Result<FileShare, ShareError> {
        Ok(FileShare {
            location: ShareLocation::parse(share_name)?,
            creds,
            mount_point: None,
        })
    }

    /// Like [`FileShare::resolve`], but bound to where the share is mounted on this host.
    pub fn with_mount_point(
        share_name: &str,
        mount_point: &Path,
        creds: Option<ShareCredentials>,
    ) -> Result<FileShare, ShareError> {
        if !mount_point.exists() {
            return Err(ShareError::MountPointMissing(mount_point.to_path_buf()));
        }
        if !mount_point.is_dir() {
            return Err(ShareError::NotADirectory(mount_point.to_path_buf()));
        }
        let mut share = FileShare::resolve(share_name, creds)?;
        share.mount_point = Some(mount_point.to_path_buf());
        Ok(share)
    }

    /// Pick `resolve` or `with_mount_point` depending on whether a mount point was given.
    pub fn from_parts(
        share_name: &str,
        share_user: Option<&str>,
        share_pwd: Option<&str>,
        share_mnt: Option<&Path>,
    ) -> Result<FileShare, ShareError> {
        let creds = ShareCredentials::new(share_user, share_pwd);
        match share_mnt {
            Some(mnt) => FileShare::with_mount_point(share_name, mnt, creds),
            None => FileShare::resolve(share_name, creds),
        }
    }

    pub fn new_file(&self, file_name: &str) -> ScpFile {
        ScpFile {
            share: self.clone(),
            file_name: file_name.to_string(),
        }
    }
}

impl fmt::Display for FileShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mount_point {
            Some(mnt) => write!(f, "{} (mounted at {})", self.location, mnt.display()),
            None => write!(f, "{}", self.location),
        }
    }
}

/// A profile file on a [`FileShare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpFile {
    pub share: FileShare,
    pub file_name: String,
}

impl ScpFile {
    /// Path the file can be read from on this host, if any.
    pub fn local_path(&self) -> Option<PathBuf> {
        match (&self.share.location, &self.share.mount_point) {
            (ShareLocation::Local(dir), _) => Some(dir.join(&self.file_name)),
            (_, Some(mnt)) => Some(mnt.join(&self.file_name)),
            (_, None) => None,
        }
    }

    /// `ShareParameters` telling the iDRAC where to fetch the file from. A local share only
    /// carries the target; its contents travel in the import buffer instead.
    pub fn share_parameters(&self, target: ScpTarget) -> ShareParameters {
        let (host, share_name) = match &self.share.location {
            ShareLocation::Local(_) => {
                return ShareParameters {
                    target,
                    ..Default::default()
                }
            }
            ShareLocation::Cifs { host, share } => (host, share),
            ShareLocation::Nfs { host, export } => (host, export),
        };
        let (user_name, workgroup) = self
            .share
            .creds
            .as_ref()
            .map(|c| c.user_and_workgroup())
            .unwrap_or_default();
        ShareParameters {
            target,
            share_type: Some(self.share.location.share_type()),
            ip_address: Some(host.clone()),
            share_name: Some(share_name.clone()),
            file_name: Some(self.file_name.clone()),
            user_name,
            password: self.share.creds.as_ref().and_then(|c| c.password.clone()),
            workgroup,
        }
    }
}

impl fmt::Display for ScpFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.share.location {
            ShareLocation::Local(dir) => write!(f, "{}", dir.join(&self.file_name).display()),
            ShareLocation::Cifs { host, share } => {
                write!(f, "//{host}/{share}/{}", self.file_name)
            }
            ShareLocation::Nfs { host, export } => {
                write!(f, "{host}:{}/{}", export.trim_end_matches('/'), self.file_name)
            }
        }
    }
}
