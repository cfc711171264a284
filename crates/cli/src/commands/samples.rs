//! Sample submission and listing commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, SampleRequest};
use crate::output::{
    color_anomaly, color_status, format_timestamp, format_unix, print_json, print_table,
    print_warning, OutputFormat,
};

/// Row for recent samples table
#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU %")]
    cpu: String,
    #[tabled(rename = "RPS")]
    rps: String,
}

/// Submit a single sample
pub async fn send_sample(
    client: &ApiClient,
    sample: SampleRequest,
    format: OutputFormat,
) -> Result<()> {
    let result = client.send_sample(&sample).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Sample Submitted".bold());
            println!("{}", "=".repeat(50));
            println!("ID:                     {}", result.id.cyan());
            println!("Status:                 {}", color_status(&result.status));
            println!("RPS:                    {:.2}", result.rps);
            println!("Rolling average:        {:.2}", result.rolling_average);
            println!("Window:                 {}", result.window);
            println!("Classification:         {}", color_anomaly(result.is_anomaly));
            println!(
                "Received:               {}",
                format_timestamp(&result.received_at).dimmed()
            );

            if !result.stored {
                print_warning("Sample was analysed but not persisted");
            }
        }
    }

    Ok(())
}

/// List recently stored samples
pub async fn show_recent(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let result = client.recent(limit).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Recent Samples".bold(),
                format!("({})", result.backend).dimmed()
            );

            let rows: Vec<SampleRow> = result
                .samples
                .iter()
                .map(|s| SampleRow {
                    time: format_unix(s.timestamp),
                    cpu: format!("{:.1}", s.cpu),
                    rps: format!("{:.2}", s.rps),
                })
                .collect();

            print_table(&rows);
            if !rows.is_empty() {
                println!("\nTotal: {} samples", rows.len());
            }
        }
    }

    Ok(())
}
