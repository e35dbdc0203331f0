use anyhow::Result;
use crossterm::style::{self, Stylize};

use sweep::config::AppConfig;

pub fn run(cfg: &AppConfig) -> Result<()> {
    if let Some(dest) = &cfg.json {
        return super::write_json(dest, &cfg.detected);
    }

    if cfg.detected.is_empty() {
        eprintln!("{} No container runtimes detected", "!".yellow().bold());
        return Ok(());
    }

    for rt in &cfg.detected {
        let selected = cfg.runtime.as_ref() == Some(rt);
        println!(
            "{} {:<8} {}",
            if selected { "*".green().bold() } else { " ".stylize() },
            rt.kind,
            style::style(rt.binary_path.display()).dim(),
        );
    }
    Ok(())
}
