//! search-rs - interactive document search client
//!
//! Every plain input line is treated as the search box content; lines starting
//! with `/` are commands.

use clap::Parser;
use search_rs::{
    telemetry, ClientConfig, ContentSearchBridge, CoordinatorOptions, CountBroadcaster,
    ErrorEvent, FileIngestionReporter, HttpBackend, SearchBackend, SearchCoordinator, SearchMode,
    SearchResultRow,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "search-rs")]
#[command(about = "Search an ingested document corpus", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

const HELP: &str = "Type to search. Commands: /exact /fuzzy /check /file <path> /clear /help /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    telemetry::init(&config.logging)?;

    info!("Starting search-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", config.backend.base_url);

    let backend: Arc<dyn SearchBackend> = Arc::new(HttpBackend::new(config.backend.clone())?);
    let count = CountBroadcaster::new();

    let (error_tx, mut error_rx) = tokio::sync::mpsc::unbounded_channel::<ErrorEvent>();
    let error_tx = Arc::new(error_tx);
    tokio::spawn(async move {
        while let Some(event) = error_rx.recv().await {
            eprintln!("error [{}]: {}", event.operation, event.message);
        }
    });

    let coordinator = SearchCoordinator::new(
        backend.clone(),
        count.clone(),
        error_tx.clone(),
        CoordinatorOptions::from_config(&config),
    );
    let bridge = ContentSearchBridge::new(
        backend.clone(),
        count.clone(),
        error_tx.clone(),
        &config.content,
    );
    let ingestion = FileIngestionReporter::new(backend, coordinator.clone(), error_tx);

    let _count_widget = count.subscribe(|n| println!("{} matches", n));

    let mut views = coordinator.subscribe();
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            if view.loading {
                println!("searching ({})...", view.mode);
            } else {
                print_rows(&view.rows);
            }
        }
    });

    println!("{}", HELP);
    coordinator.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim_end();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) => break,
            ("/help", _) => println!("{}", HELP),
            ("/exact", _) => {
                let _ = coordinator.set_mode(SearchMode::Exact);
            }
            ("/fuzzy", _) => {
                let _ = coordinator.set_mode(SearchMode::Fuzzy);
            }
            ("/check", _) => {
                println!("checking for new files...");
                let report = ingestion.check_for_new_files().await;
                println!("{}", report);
            }
            ("/file", path) if !path.trim().is_empty() => {
                if let Ok(rows) = bridge.search_file(Path::new(path.trim())).await {
                    print_rows(&rows);
                }
            }
            ("/clear", _) => {
                if bridge.clear().await.is_ok() {
                    println!("selected file cleared");
                }
            }
            _ => coordinator.set_term(input),
        }
    }

    coordinator.shutdown();
    info!("search-rs stopped");
    Ok(())
}

fn print_rows(rows: &[SearchResultRow]) {
    if rows.is_empty() {
        println!("(no matching pages)");
        return;
    }

    for row in rows {
        println!(
            "{:<40} p.{}/{}  {}",
            row.document_name,
            row.page_number,
            row.total_pages,
            row.content.replace('\n', " ")
        );
    }
}
