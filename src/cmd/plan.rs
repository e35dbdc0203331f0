use anyhow::{Context, Result};
use crossterm::style::Stylize;

use sweep::classify::Plan;
use sweep::config::AppConfig;
use sweep::graph::ImageGraph;
use sweep::progress::Spinner;

/// Compute what a run would delete, without deleting anything.
pub fn run(cfg: &AppConfig) -> Result<()> {
    super::print_runtime_summary(cfg);
    let runtime = cfg
        .cli_runtime()
        .context("No container runtime detected. Install Docker or Podman, or pass --runtime.")?;

    let spinner = cfg.progress.then(|| Spinner::new("Reading runtime state..."));
    let graph = ImageGraph::build(&runtime, cfg.history_parents)?;
    graph.check_acyclic()?;
    let plan = Plan::from_graph(&graph)?;
    if let Some(spinner) = spinner {
        spinner.finish(format!(
            "Read {} images, {} containers",
            graph.all_images.len(),
            graph.containers.len()
        ));
    }

    if let Some(dest) = &cfg.json {
        return super::write_json(dest, &plan);
    }

    if plan.is_empty() {
        println!("Nothing to collect.");
        return Ok(());
    }

    println!("{} ({})", "Dead containers".bold(), plan.dead_containers.len());
    for id in &plan.dead_containers {
        println!("  {}", super::short_id(id.as_str()));
    }
    println!();

    println!("{} ({})", "Remote tags".bold(), plan.remote_tags.len());
    for t in &plan.remote_tags {
        println!("  {}  {}", super::short_id(t.image.as_str()), t.tag);
    }
    println!();

    println!("{} ({}, removal order)", "Images".bold(), plan.images.len());
    for id in &plan.images {
        let parent = graph
            .parent(id)
            .map(|p| format!("  (parent {})", super::short_id(p.as_str())))
            .unwrap_or_default();
        println!("  {}{}", super::short_id(id.as_str()), parent.dim());
    }

    Ok(())
}
