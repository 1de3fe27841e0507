use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wishwall_core::IdentityPolicy;
use wishwall_core::config::{self, CONFIG_FILE, WallConfig};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.wishwall/` already exists.
    #[arg(long)]
    pub force: bool,

    /// Identity policy for this wall: `gated` requires a connected wallet,
    /// `open` attributes every wish to the anonymous label. Defaults to
    /// `gated` on a new wall and to the current policy with `--force`.
    #[arg(long)]
    pub policy: Option<IdentityPolicy>,
}

const GITIGNORE: &str = "session.json\n*.lock\n*.tmp\n*.corrupt-*\n";

#[derive(Debug, Serialize)]
struct InitReport {
    wall_dir: String,
    config: String,
    policy: IdentityPolicy,
}

/// Execute `wish init`. Creates the wall skeleton:
///
/// ```text
/// .wishwall/
///   config.toml   (identity policy and storage settings)
///   .gitignore    (session.json, lock/tmp/corrupt files)
/// ```
///
/// The slot itself (`wishes.json`) is written by the first submission.
/// With `--force`, settings already in `config.toml` are kept and only
/// `--policy`, when given, is replaced. An unparseable config is replaced by
/// defaults.
///
/// # Errors
///
/// Returns an error if `.wishwall/` already exists and `--force` is not set,
/// or if any filesystem operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let wall_dir = config::wall_dir(project_root);

    if wall_dir.exists() && !args.force {
        anyhow::bail!(".wishwall/ already exists. Use `wish init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&wall_dir)
        .with_context(|| format!("Failed to create wall directory: {}", wall_dir.display()))?;

    let mut wall = if args.force {
        existing_config(project_root)
    } else {
        WallConfig::default()
    };
    if let Some(policy) = args.policy {
        wall.identity.policy = policy;
    }
    let policy = wall.identity.policy;

    let config_path = wall_dir.join(CONFIG_FILE);
    std::fs::write(&config_path, wall.to_toml()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = wall_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    tracing::info!(dir = %wall_dir.display(), %policy, "wall initialized");

    let report = InitReport {
        wall_dir: wall_dir.display().to_string(),
        config: config_path.display().to_string(),
        policy,
    };
    render(output, &report, |report, w| {
        writeln!(w, "✓ Initialized .wishwall/ ({} wall).", report.policy)?;
        writeln!(w)?;
        writeln!(w, "  Config: .wishwall/{CONFIG_FILE}")?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        if report.policy.requires_identity() {
            writeln!(w, "  Connect your wallet:")?;
            writeln!(w, "    wish connect <PUBLIC_KEY>")?;
            writeln!(w)?;
        }
        writeln!(w, "  Make your first wish:")?;
        writeln!(w, "    wish submit \"I wish for rain\"")
    })
}

fn existing_config(project_root: &Path) -> WallConfig {
    config::load_wall_config(project_root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "existing config unreadable; rewriting defaults");
        WallConfig::default()
    })
}
