/*
 * SPDX-FileCopyrightText: Copyright (c) 2022 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
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

/* Server Configuration Profile import module.
 *
 * USAGE: ./idrac_import_scp [-v] [--check] ARGS_FILE
 * ARGS_FILE: JSON object with the module arguments (idrac_ip, idrac_user, idrac_pwd,
 * share_name, scp_file, ...), as written by the configuration-management tool.
 * Prints {"changed": .., "failed": .., "msg": ..} on stdout. Logs go to stderr.
 * Exits 1 when the import failed.
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use idrac_scp::{import, IdracConnection, ModuleArgs, ModuleResult};
use tracing::{debug, error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Import a Server Configuration Profile onto a Dell iDRAC")]
struct Cli {
    /// JSON file holding the module arguments
    args_file: PathBuf,

    /// Log at DEBUG level. Default is INFO
    #[arg(short, long)]
    verbose: bool,

    /// Report what would change without contacting the iDRAC
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(&cli).unwrap_or_else(|err| {
        error!("{err:#}");
        ModuleResult::failure(format!("{err:#}"))
    });

    match serde_json::to_string(&result) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            error!("Could not serialize module result: {err}");
            return ExitCode::FAILURE;
        }
    }
    if result.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: &Cli) -> Result<ModuleResult, anyhow::Error> {
    let args = ModuleArgs::from_file(&cli.args_file)?;
    debug!("{args:?}");

    if cli.check || args.check_mode {
        info!("Check mode, not contacting {}", args.idrac_ip);
        return Ok(import::check_mode_outcome().into_result());
    }

    let mut conn = IdracConnection::new(args.clone());
    conn.connect()
        .with_context(|| format!("Connecting to iDRAC {}", args.idrac_ip))?;

    if args.share_mnt.is_some() {
        if let Err(err) = conn.mount_share() {
            conn.disconnect();
            return Err(err.into());
        }
    }

    let outcome = match conn.handle() {
        Some(idrac) => idrac_scp::import_server_config_profile(idrac, &args, false),
        None => {
            return Err(anyhow::anyhow!("Lost session to iDRAC {}", args.idrac_ip));
        }
    };
    conn.disconnect();

    info!(
        "changed={} failed={} errored={}",
        outcome.changed(),
        outcome.failed(),
        outcome.errored()
    );
    Ok(outcome.into_result())
}

fn init_logging(verbose: bool) {
    let log_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("rustls=warn".parse().unwrap());
    tracing_subscriber::registry()
        .with(
            Layer::default()
                .compact()
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();
}
