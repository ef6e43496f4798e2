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
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    network::RedfishClientPool, ConnectionError, Idrac, ModuleArgs, RedfishClientPoolBuilder,
    RedfishError,
};

enum Session {
    None,
    /// Opened by this connection, closed by [`IdracConnection::disconnect`].
    Owned(Box<dyn Idrac>),
    /// Handed in by the caller, who keeps responsibility for closing it.
    Supplied(Arc<dyn Idrac>),
}

/// Opens, shares and closes the session to one iDRAC.
pub struct IdracConnection {
    args: ModuleArgs,
    pool: RedfishClientPoolBuilder,
    session: Session,
}

impl IdracConnection {
    pub fn new(args: ModuleArgs) -> IdracConnection {
        IdracConnection {
            args,
            pool: RedfishClientPool::builder(),
            session: Session::None,
        }
    }

    /// Use a session the caller already holds. [`IdracConnection::disconnect`] leaves it open.
    pub fn with_session(args: ModuleArgs, session: Arc<dyn Idrac>) -> IdracConnection {
        IdracConnection {
            args,
            pool: RedfishClientPool::builder(),
            session: Session::Supplied(session),
        }
    }

    /// Adopt an already open session; it is closed on disconnect like one opened by `connect`.
    pub fn from_handle(args: ModuleArgs, handle: Box<dyn Idrac>) -> IdracConnection {
        IdracConnection {
            args,
            pool: RedfishClientPool::builder(),
            session: Session::Owned(handle),
        }
    }

    /// Transport settings used when `connect` opens a new session.
    pub fn with_pool_builder(mut self, pool: RedfishClientPoolBuilder) -> IdracConnection {
        self.pool = pool;
        self
    }

    pub fn handle(&self) -> Option<&dyn Idrac> {
        match &self.session {
            Session::None => None,
            Session::Owned(h) => Some(h.as_ref()),
            Session::Supplied(h) => Some(h.as_ref()),
        }
    }

    pub fn is_caller_managed(&self) -> bool {
        matches!(self.session, Session::Supplied(_))
    }

    /// Return the current session, opening one first if there is none.
    pub fn connect(&mut self) -> Result<&dyn Idrac, ConnectionError> {
        if matches!(self.session, Session::None) {
            let handle = self.open()?;
            self.session = Session::Owned(handle);
        }
        self.handle().ok_or_else(|| {
            ConnectionError::Configuration("no session to the iDRAC could be opened".to_string())
        })
    }

    /// Close the session if this connection owns it. Returns false, and does nothing, for a
    /// caller supplied session.
    pub fn disconnect(&mut self) -> bool {
        match std::mem::replace(&mut self.session, Session::None) {
            Session::Supplied(h) => {
                self.session = Session::Supplied(h);
                false
            }
            Session::Owned(h) => {
                if let Err(err) = h.logout() {
                    warn!("Failed closing session to {}: {err}", self.args.idrac_ip);
                }
                true
            }
            Session::None => true,
        }
    }

    /// Resolve the network share from the arguments and bind it to the session.
    /// Returns false if no share was named.
    pub fn mount_share(&mut self) -> Result<bool, ConnectionError> {
        if self.args.share_name.trim().is_empty() {
            return Ok(false);
        }
        let share = self
            .args
            .file_share()
            .map_err(|err| ConnectionError::ShareMount(format!("Error: {err}")))?;
        let idrac = self.handle().ok_or_else(|| {
            ConnectionError::ShareMount("Error: not connected to the iDRAC".to_string())
        })?;
        idrac
            .set_liaison_share(share)
            .map_err(|err| ConnectionError::ShareMount(format!("Error: {err}")))?;
        Ok(true)
    }

    fn open(&self) -> Result<Box<dyn Idrac>, ConnectionError> {
        let args = &self.args;
        if args.idrac_ip.is_empty() || args.idrac_user.is_empty() || args.idrac_pwd.is_empty() {
            return Err(ConnectionError::Configuration(
                "hostname, username and password required".to_string(),
            ));
        }
        let pool = self.pool.build().map_err(ConnectionError::DriverInit)?;
        info!("Connecting to iDRAC {}:{}", args.idrac_ip, args.idrac_port);
        pool.create_client(args.endpoint()).map_err(|err| match err {
            RedfishError::UnsupportedVendor(vendor) => {
                warn!("{} reports vendor {vendor}", args.idrac_ip);
                ConnectionError::DriverNotFound(args.idrac_ip.clone())
            }
            err => ConnectionError::Redfish(err),
        })
    }
}
