//! `wish list`: show every wish on the wall, oldest first.

use crate::cmd::warn_load_outcome;
use crate::output::{OutputMode, Renderable, pretty_rule, render_list_to};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use wishwall_core::config::WallConfig;
use wishwall_core::identity::StaticProvider;
use wishwall_core::{Wish, WishCollection};

const UNKNOWN_DATE: &str = "-";

/// One wish as shown to users.
#[derive(Debug, Clone, Serialize)]
pub struct WishView {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub timestamp: i64,
    pub date: String,
}

impl WishView {
    pub fn new(wish: &Wish) -> Self {
        let date = wish.created_at().map_or_else(
            || UNKNOWN_DATE.to_string(),
            |at| local_date(&at.with_timezone(&Local)),
        );
        Self {
            id: wish.id,
            text: wish.text.clone(),
            author: wish.author.clone(),
            timestamp: wish.timestamp,
            date,
        }
    }

    pub fn from_collection(wishes: &WishCollection) -> Vec<Self> {
        wishes.iter().map(Self::new).collect()
    }
}

fn local_date(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d").to_string()
}

impl Renderable for WishView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.text)?;
        writeln!(w, "  by {} on {}", self.author, self.date)?;
        pretty_rule(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        // Tabs and newlines in the text would break the row layout.
        let text = self.text.replace(['\t', '\n', '\r'], " ");
        writeln!(w, "{}\t{}\t{}\t{}", self.id, self.author, self.date, text)
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "AUTHOR", "DATE", "TEXT"]
    }
}

/// Listing never attributes anything, so no wallet is consulted.
pub fn run_list(wall: &WallConfig, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut store = wishwall_core::open_wall(project_root, wall, StaticProvider::disconnected());
    store.initialize();
    warn_load_outcome(store.load_outcome(), output);

    let wishes = store.list()?;
    tracing::debug!(count = wishes.len(), "listing wishes");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(&WishView::from_collection(&wishes), output, &mut out)?;
    Ok(())
}

fn write_list(views: &[WishView], output: OutputMode, out: &mut dyn Write) -> io::Result<()> {
    if views.is_empty() && output == OutputMode::Pretty {
        return writeln!(out, "No wishes yet. Be the first: wish submit \"...\"");
    }
    if output == OutputMode::Pretty {
        writeln!(out, "Wishes ({})", views.len())?;
        pretty_rule(out)?;
    }
    render_list_to(views, output, out)
}
