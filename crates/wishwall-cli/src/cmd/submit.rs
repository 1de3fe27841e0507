//! `wish submit`: add a wish to the wall.

use crate::cmd::list::WishView;
use crate::cmd::{require_wall, warn_load_outcome};
use crate::output::{CliError, OutputMode, Renderable, render, render_error};
use crate::wallet::CliWallet;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wishwall_core::SubmitError;
use wishwall_core::config::WallConfig;
use wishwall_core::session::SessionFile;

pub const SUBMITTED: &str = "Wish submitted successfully!";

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Wish text. Multiple words are joined with single spaces; put text
    /// that starts with `-` after `--`.
    pub text: Vec<String>,
}

impl SubmitArgs {
    pub fn joined(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Debug, Serialize)]
struct SubmitReport {
    ok: bool,
    message: &'static str,
    wish: WishView,
}

pub fn run_submit(
    args: &SubmitArgs,
    wall: &WallConfig,
    identity_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let wall_dir = require_wall(project_root, output)?;
    let wallet = CliWallet::resolve(identity_flag, SessionFile::in_dir(&wall_dir));
    tracing::debug!(source = wallet.source(), "wallet resolved");

    let mut store = wishwall_core::open_wall(project_root, wall, wallet);
    store.initialize();
    warn_load_outcome(store.load_outcome(), output);

    match store.submit(&args.joined()) {
        Ok(wish) => {
            let report = SubmitReport {
                ok: true,
                message: SUBMITTED,
                wish: WishView::new(&wish),
            };
            render(output, &report, |r, w| {
                if output == OutputMode::Text {
                    r.wish.render_table(w)?;
                } else {
                    writeln!(w, "✓ {}", r.message)?;
                    writeln!(w)?;
                    r.wish.render_human(w)?;
                }
                Ok(())
            })
        }
        Err(err) => {
            if let SubmitError::Persistence { wish, .. } = &err {
                tracing::warn!(id = wish.id, error = %err, "wish not saved");
                let report = SubmitReport {
                    ok: false,
                    message: "Wish kept for this session but not saved",
                    wish: WishView::new(wish),
                };
                render(output, &report, |r, w| r.wish.render_human(w))?;
            }
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use wishwall_core::WishCollection;
    use wishwall_core::identity::IdentityPolicy;

    #[derive(clap::Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: SubmitArgs,
    }

    fn parse(argv: &[&str]) -> SubmitArgs {
        use clap::Parser;
        Wrapper::parse_from(argv).args
    }

    fn wall_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join(".wishwall")).expect("mkdir");
        root
    }

    fn open_wall() -> WallConfig {
        let mut wall = WallConfig::default();
        wall.identity.policy = IdentityPolicy::Open;
        wall
    }

    fn on_disk(root: &Path) -> WishCollection {
        let bytes = fs::read(root.join(".wishwall/wishes.json")).expect("slot");
        WishCollection::from_bytes(&bytes).expect("parse")
    }

    #[test]
    fn words_are_joined_with_spaces() {
        let args = parse(&["test", "I", "wish", "for", "rain"]);
        assert_eq!(args.joined(), "I wish for rain");
    }

    #[test]
    fn no_words_is_empty_text() {
        let args = parse(&["test"]);
        assert_eq!(args.joined(), "");
    }

    #[test]
    fn hyphenated_text_after_separator() {
        let args = parse(&["test", "--", "-5", "degrees", "please"]);
        assert_eq!(args.joined(), "-5 degrees please");
    }

    #[test]
    fn open_wall_submit_persists() {
        let root = wall_root();
        let args = parse(&["test", "I", "wish", "for", "rain"]);
        run_submit(&args, &open_wall(), None, OutputMode::Json, root.path()).expect("submit");

        let wishes = on_disk(root.path());
        assert_eq!(wishes.len(), 1);
        assert_eq!(wishes.as_slice()[0].text, "I wish for rain");
        assert_eq!(wishes.as_slice()[0].author, "Anonymous User");
    }

    #[test]
    fn gated_wall_with_identity_flag() {
        let root = wall_root();
        let args = parse(&["test", "I wish for rain"]);
        run_submit(
            &args,
            &WallConfig::default(),
            Some("AbCdEfGh12345"),
            OutputMode::Json,
            root.path(),
        )
        .expect("submit");

        assert_eq!(on_disk(root.path()).as_slice()[0].author, "AbCdEfGh12...");
    }

    #[test]
    fn blank_wish_is_rejected() {
        let root = wall_root();
        let args = parse(&["test", "  "]);
        let err = run_submit(&args, &open_wall(), None, OutputMode::Json, root.path())
            .expect_err("blank wish");
        assert!(err.to_string().contains("empty"));
        assert!(!root.path().join(".wishwall/wishes.json").exists());
    }

    #[test]
    fn submit_requires_wall() {
        let root = tempfile::tempdir().expect("tempdir");
        let args = parse(&["test", "rain"]);
        assert!(run_submit(&args, &open_wall(), None, OutputMode::Json, root.path()).is_err());
    }
}
