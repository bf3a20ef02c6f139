//! Show the configured sources.

use anyhow::Result;
use colored::Colorize;
use petri::prelude::*;

pub fn run() -> Result<()> {
    let config = PipelineConfig::from_env();

    println!("{}", "Petri Sources".white().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();

    for source in Source::LIVE {
        let name = format!("{:<16}", source.to_string());
        let status = if config.is_enabled(source) {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        println!("  {} {}", name.cyan(), status);
    }

    let fallback = format!("{:<16}", Source::VectorFallback.to_string());
    println!("  {} {}", fallback.cyan(), "serves outages".dimmed());
    println!();

    if cfg!(feature = "http") {
        println!("{} Live connectors compiled in", "✓".green());
    } else {
        println!(
            "{} Live connectors not compiled; rebuild with {} or use {}",
            "•".yellow(),
            "--features http".cyan(),
            "petri ask --offline".cyan()
        );
    }
    println!(
        "  Toggle sources via {}, {}, {}.",
        "PETRI_ENABLE_PUBMED".cyan(),
        "PETRI_ENABLE_UNIPROT".cyan(),
        "PETRI_ENABLE_DRUGBANK".cyan()
    );

    Ok(())
}
