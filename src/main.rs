mod core;
mod stream;
#[cfg(test)]
mod test_support;
mod tui;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

use crate::core::config;

#[derive(Parser)]
#[command(name = "folio", about = "Ask questions about an uploaded PDF document")]
struct Args {
    /// Base URL of the answer server
    #[arg(short, long)]
    server: Option<String>,

    /// Server-side path of the document to ask about
    #[arg(short, long)]
    document: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to folio.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("folio.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    let resolved = config::resolve(&file_config, args.server.as_deref(), args.document.as_deref());

    if resolved.document.is_none() {
        eprintln!(
            "No document set. Pass --document, set FOLIO_DOCUMENT, or add it to {}",
            config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "~/.folio/config.toml".to_string())
        );
        std::process::exit(1);
    }

    log::info!(
        "Folio starting up: server={}, document={:?}",
        resolved.base_url,
        resolved.document
    );

    tui::run(resolved)
}
