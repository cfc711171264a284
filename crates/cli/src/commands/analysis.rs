//! Analysis and health commands

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, format_unix, print_json, OutputFormat};

/// Show rolling statistics for the current window
pub async fn show_analysis(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.analyze().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Window Analysis".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Window:                 {} / {}",
                result.window_size, result.window_capacity
            );
            println!("Algorithm:              {}", result.algorithm.cyan());
            println!();

            println!("{}", "Statistics".bold());
            println!("{}", "-".repeat(50));
            println!("Rolling average:        {:.2}", result.rolling_average);
            println!("Std deviation:          {:.2}", result.std_dev);
            println!("Min:                    {:.2}", result.min);
            println!("Max:                    {:.2}", result.max);
            println!();

            println!("{}", "Anomalies".bold());
            println!("{}", "-".repeat(50));
            let total = result.anomaly_count_total.to_string();
            println!(
                "Detected at ingest:     {}",
                if result.anomaly_count_total > 0 {
                    total.red().bold()
                } else {
                    total.green()
                }
            );
            println!("In current window:      {}", result.window_anomalies);
            println!();

            println!(
                "Last updated: {}",
                format_unix(result.last_updated_at).dimmed()
            );
        }
    }

    Ok(())
}

/// Show service health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Service:                {}", result.service.cyan());
            println!("Version:                {}", result.version);
            println!("Status:                 {}", color_status(&result.status));
            println!(
                "Checked:                {}",
                format_timestamp(&result.timestamp).dimmed()
            );
        }
    }

    Ok(())
}
