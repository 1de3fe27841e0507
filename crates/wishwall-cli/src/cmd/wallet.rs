//! `wish connect`, `wish disconnect`, `wish whoami`: wallet session handling.

use crate::cmd::require_wall;
use crate::output::{CliError, OutputMode, pretty_kv, render, render_error};
use crate::wallet::CliWallet;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wishwall_core::config::{self, WallConfig};
use wishwall_core::identity::{IdentityGate, IdentityProvider, truncate_identity};
use wishwall_core::session::SessionFile;

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Wallet identity (public key) to connect.
    pub identity: String,
}

#[derive(Debug, Serialize)]
struct ConnectReport {
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<String>,
}

#[derive(Debug, Serialize)]
struct WhoamiReport {
    policy: String,
    connected: bool,
    source: &'static str,
    identity: Option<String>,
    display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    connected_at: Option<String>,
}

pub fn run_connect(
    args: &ConnectArgs,
    wall: &WallConfig,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let wall_dir = require_wall(project_root, output)?;
    let mut session = SessionFile::in_dir(&wall_dir);

    if let Err(e) = session.connect(&args.identity) {
        render_error(output, &CliError::from(&e))?;
        anyhow::bail!("{e}");
    }

    let identity = args.identity.trim().to_string();
    let display = truncate_identity(&identity, wall.identity.display_prefix_len);
    let report = ConnectReport {
        connected: true,
        identity: Some(identity),
        display: Some(display),
    };
    render(output, &report, |r, w| {
        writeln!(
            w,
            "✓ Wallet connected: {}",
            r.display.as_deref().unwrap_or_default()
        )
    })
}

pub fn run_disconnect(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let wall_dir = require_wall(project_root, output)?;
    let mut session = SessionFile::in_dir(&wall_dir);

    let was_connected = session.is_connected();
    if let Err(e) = session.disconnect() {
        render_error(output, &CliError::from(&e))?;
        anyhow::bail!("{e}");
    }

    let report = ConnectReport {
        connected: false,
        identity: None,
        display: None,
    };
    render(output, &report, |_, w| {
        if was_connected {
            writeln!(w, "✓ Wallet disconnected")
        } else {
            writeln!(w, "No wallet was connected")
        }
    })
}

pub fn run_whoami(
    wall: &WallConfig,
    identity_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let session = SessionFile::in_dir(&config::wall_dir(project_root));
    let connected_at = session
        .connected_at()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|at| at.with_timezone(&chrono::Local).to_rfc3339());

    let wallet = CliWallet::resolve(identity_flag, session);
    let source = wallet.source();
    let gate = IdentityGate::new(wallet, wall.gate_settings());

    let report = WhoamiReport {
        policy: gate.policy().to_string(),
        connected: gate.is_connected(),
        source,
        identity: gate.current_identity(),
        display: gate.display_identity(),
        connected_at: if source == "session" { connected_at } else { None },
    };

    render(output, &report, |r, w| {
        if output == OutputMode::Text {
            return writeln!(
                w,
                "{}\t{}\t{}\t{}",
                r.policy, r.connected, r.source, r.display
            );
        }
        pretty_kv(w, "Policy", &r.policy)?;
        pretty_kv(w, "Connected", if r.connected { "yes" } else { "no" })?;
        pretty_kv(w, "Source", r.source)?;
        pretty_kv(w, "Display", &r.display)?;
        if let Some(at) = &r.connected_at {
            pretty_kv(w, "Since", at)?;
        }
        Ok(())
    })
}
