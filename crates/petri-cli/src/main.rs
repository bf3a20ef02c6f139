//! Petri CLI - biomedical questions from the command line.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "petri")]
#[command(author, version, about = "Petri - evidence retrieval and hypothesis confidence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one query
    Ask {
        /// The biomedical question
        query: String,

        /// Evidence items to retrieve
        #[arg(short, long)]
        limit: Option<usize>,

        /// Answer from the bundled corpus instead of live sources
        #[arg(long)]
        offline: bool,

        /// Restrict retrieval to these sources (e.g. "pubmed,uniprot")
        #[arg(short, long)]
        sources: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            query,
            limit,
            offline,
            sources,
            json,
        } => commands::ask::run(&query, limit, offline, sources.as_deref(), json, cli.verbose).await,
        Commands::Sources => commands::sources::run(),
    }
}
