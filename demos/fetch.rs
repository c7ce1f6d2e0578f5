//! Download files given on the command line, in chunks, with progress bars.
//!
//! ```text
//! RUST_LOG=shardload=debug cargo run --example fetch -- https://example.com/big.iso
//! ```
//!
//! Interrupt it and run it again: finished chunks are not downloaded twice.

use color_eyre::{eyre::eyre, Result};
use shardload::download::Download;
use shardload::downloader::DownloaderBuilder;
use shardload::presets::{download_headers, HostSelection};
use shardload::JobStatus;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let downloads = std::env::args()
        .skip(1)
        .map(|url| Download::try_from(url.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    if downloads.is_empty() {
        return Err(eyre!("usage: fetch <url>..."));
    }

    let selection = HostSelection::from_env();
    let downloader = DownloaderBuilder::new()
        .directory(PathBuf::from("downloads"))
        .headers(download_headers(selection.host()))
        .task_limit(8)
        .single_file_progress(true)
        .build();

    let summaries = downloader.download(&downloads, None).await;
    for summary in &summaries {
        match summary.status() {
            JobStatus::Finished => println!(
                "{}: {} bytes, {} chunks resumed",
                summary.download().filename,
                summary.size(),
                summary.resumed_chunks()
            ),
            JobStatus::Failed(reason) => {
                println!("{}: failed: {}", summary.download().filename, reason.message)
            }
            other => println!("{}: {}", summary.download().filename, other),
        }
    }

    Ok(())
}
