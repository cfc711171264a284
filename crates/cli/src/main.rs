//! Load Analytics CLI
//!
//! A command-line tool for submitting samples, inspecting the rolling
//! analysis and load-testing the load analytics service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analysis, load, samples};
use std::time::Duration;

/// Load Analytics CLI
#[derive(Parser)]
#[command(name = "lsctl")]
#[command(author, version, about = "CLI for the Load Analytics service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via LSCTL_API_URL env var)
    #[arg(long, env = "LSCTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a single sample
    Send {
        /// Requests per second (service default applies when omitted)
        #[arg(long)]
        rps: Option<f64>,

        /// CPU utilization percent
        #[arg(long)]
        cpu: Option<f64>,

        /// Unix timestamp in seconds (server time when omitted)
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Show rolling statistics and anomaly counts
    Analyze,

    /// Show service health
    Health,

    /// List recently stored samples
    Recent {
        /// Number of samples to fetch
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Generate load with random samples
    Load {
        /// Total number of samples to send
        #[arg(long, short = 'n', default_value_t = 100)]
        requests: usize,

        /// Number of concurrent workers
        #[arg(long, short, default_value_t = 10)]
        concurrency: usize,

        /// Pause between requests of each worker, in milliseconds
        #[arg(long, default_value_t = 100)]
        pause_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    if cli.verbose {
        output::print_info(&format!("Using API at {}", cli.api_url));
    }

    // Execute command
    match cli.command {
        Commands::Send {
            rps,
            cpu,
            timestamp,
        } => {
            let sample = client::SampleRequest {
                timestamp,
                cpu,
                rps,
            };
            samples::send_sample(&client, sample, cli.format).await?;
        }
        Commands::Analyze => {
            analysis::show_analysis(&client, cli.format).await?;
        }
        Commands::Health => {
            analysis::show_health(&client, cli.format).await?;
        }
        Commands::Recent { limit } => {
            samples::show_recent(&client, limit, cli.format).await?;
        }
        Commands::Load {
            requests,
            concurrency,
            pause_ms,
        } => {
            let options = load::LoadOptions {
                requests,
                concurrency,
                pause: Duration::from_millis(pause_ms),
                verbose: cli.verbose,
            };
            load::run_load_test(&client, options, cli.format).await?;
        }
    }

    Ok(())
}
