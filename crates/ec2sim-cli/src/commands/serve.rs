//! Serve command - Run the endpoint until Ctrl-C.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use ec2sim::prelude::*;

use crate::OutputFormat;
use crate::settings::{Overrides, Settings};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Log every store event as it happens
    #[arg(long)]
    pub log_events: bool,

    /// Print per-action request counts on shutdown
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Debug, Serialize)]
struct Listening<'a> {
    url: &'a str,
    owner_id: &'a str,
}

/// Execute the serve command.
pub fn execute(
    args: ServeArgs,
    config: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let settings = args.overrides.apply(Settings::load(config)?);

    let mut builder = Ec2Sim::builder()
        .with_store_config(settings.store)
        .with_server_config(settings.server);
    if args.log_events {
        builder = builder.with_event_subscriber(Arc::new(LoggingSubscriber::new()));
    }
    let runtime = builder.build().context("Failed to create runtime")?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    rt.block_on(async {
        let server = runtime.start().await.context("Failed to start endpoint")?;
        let url = server.url();

        if !quiet {
            match format {
                OutputFormat::Human => println!("ec2sim listening on {}", url),
                _ => println!(
                    "{}",
                    format.json(&Listening {
                        url: &url,
                        owner_id: &runtime.store().config().owner_id,
                    })?
                ),
            }
        }

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Interrupted, shutting down");
        server.shutdown().await.context("Endpoint failed")
    })?;

    if args.metrics {
        print_metrics(&runtime.metrics().snapshot(), format)?;
    }
    Ok(())
}

fn print_metrics(snapshot: &MetricsSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            println!("\nRequests: {} ({} failed)", snapshot.total_requests, snapshot.total_errors);
            for (action, metrics) in &snapshot.actions {
                println!(
                    "  {:<32} {:>6}  mean {:?}",
                    action,
                    metrics.count,
                    metrics.mean_time()
                );
            }
        }
        _ => println!("{}", format.json(snapshot)?),
    }
    Ok(())
}
