pub mod completions;
pub mod init;
pub mod list;
pub mod submit;
pub mod wallet;

use crate::output::{CliError, OutputMode, render_error};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use wishwall_core::config;
use wishwall_core::store::LoadOutcome;

const NOT_A_WALL: &str = "Not a wish wall: .wishwall directory not found";

/// Locate `.wishwall/` under `project_root`, rendering a structured error
/// when it is missing.
pub(crate) fn require_wall(project_root: &Path, output: OutputMode) -> anyhow::Result<PathBuf> {
    let wall_dir = config::wall_dir(project_root);
    if wall_dir.is_dir() {
        return Ok(wall_dir);
    }

    render_error(
        output,
        &CliError::with_details(
            NOT_A_WALL,
            "Run 'wish init' to create a new wish wall",
            wishwall_core::error::ErrorCode::NotInitialized.code(),
        ),
    )?;
    anyhow::bail!("{NOT_A_WALL}")
}

/// Tell the user when the wall came up from a damaged slot. JSON output
/// stays clean; the structured log carries the same event.
pub(crate) fn warn_load_outcome(outcome: Option<&LoadOutcome>, output: OutputMode) {
    let stderr = io::stderr();
    let mut err = stderr.lock();
    if let Err(e) = write_load_warning(outcome, output, &mut err) {
        tracing::debug!(error = %e, "could not print load warning");
    }
}

fn write_load_warning(
    outcome: Option<&LoadOutcome>,
    output: OutputMode,
    out: &mut dyn Write,
) -> io::Result<()> {
    let Some(outcome) = outcome else {
        return Ok(());
    };
    let Some(code) = outcome.code() else {
        return Ok(());
    };
    if output.is_json() {
        return Ok(());
    }

    writeln!(out, "warning: {code} {}", code.message())?;
    if let LoadOutcome::Recovered {
        quarantined: Some(path),
    } = outcome
    {
        writeln!(out, "  kept: {}", path.display())?;
    }
    if let Some(hint) = code.hint() {
        writeln!(out, "  suggestion: {hint}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(outcome: &LoadOutcome, output: OutputMode) -> String {
        let mut buf = Vec::new();
        write_load_warning(Some(outcome), output, &mut buf).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn recovered_slot_warns_with_copy_and_hint() {
        let outcome = LoadOutcome::Recovered {
            quarantined: Some(PathBuf::from(".wishwall/wishes.json.corrupt-x")),
        };
        let text = warning(&outcome, OutputMode::Pretty);
        assert!(text.starts_with("warning: E3001 Persisted wishes are corrupt\n"));
        assert!(text.contains("kept: .wishwall/wishes.json.corrupt-x"));
        assert!(text.contains("suggestion: "));
    }

    #[test]
    fn unreadable_slot_warns() {
        let text = warning(&LoadOutcome::Unreadable, OutputMode::Text);
        assert!(text.starts_with("warning: E3002"));
        assert!(text.contains("Submissions are refused"));
    }

    #[test]
    fn healthy_loads_and_json_stay_quiet() {
        assert_eq!(warning(&LoadOutcome::Loaded { count: 1 }, OutputMode::Pretty), "");
        assert_eq!(warning(&LoadOutcome::Absent, OutputMode::Text), "");
        assert_eq!(warning(&LoadOutcome::Unreadable, OutputMode::Json), "");
    }

    #[test]
    fn missing_wall_is_an_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = require_wall(root.path(), OutputMode::Json).unwrap_err();
        assert!(err.to_string().contains(".wishwall"));
    }

    #[test]
    fn existing_wall_is_found() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join(".wishwall")).expect("mkdir");
        let dir = require_wall(root.path(), OutputMode::Text).expect("found");
        assert!(dir.ends_with(".wishwall"));
    }
}
