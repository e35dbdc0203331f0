pub mod plan;
pub mod probe;
pub mod run;

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::style::{self, Stylize};
use serde::Serialize;

use sweep::config::AppConfig;

/// Write `value` as pretty JSON to stdout (`-`) or to a file.
fn write_json<T: Serialize>(dest: &str, value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    if dest == "-" {
        println!("{output}");
    } else {
        fs::write(dest, &output).with_context(|| format!("Failed to write JSON to {dest}"))?;
        eprintln!("{} Wrote {dest}", "✔".green());
    }
    Ok(())
}

fn print_runtime_summary(cfg: &AppConfig) {
    let mut stderr = io::stderr();

    match &cfg.runtime {
        Some(rt) => {
            let _ = writeln!(
                stderr,
                "{} {} ({})",
                "Runtime".dim(),
                style::style(rt.kind).green().bold(),
                style::style(rt.binary_path.display()).dim(),
            );
        }
        None => {
            let _ = writeln!(stderr, "{} No container runtime detected", "!".yellow().bold());
        }
    }
    let _ = writeln!(stderr);
}

fn short_id(id: &str) -> &str {
    let hex = id.strip_prefix("sha256:").unwrap_or(id);
    hex.get(..12).unwrap_or(hex)
}
