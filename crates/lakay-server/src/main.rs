//! Lakay — local server for app connectors and voice transcript delivery.

use std::path::PathBuf;
use std::sync::Arc;

use lakay_connectors::{FileStore, IdentifierStore, ServiceKey};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("LAKAY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn identifier_store(data_dir: &std::path::Path) -> anyhow::Result<IdentifierStore> {
    let paths = lakay_core::DataPaths::new(data_dir)?;
    Ok(IdentifierStore::new(Arc::new(FileStore::new(&paths.storage))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "identity" => {
                let identity = identifier_store(&resolve_data_dir())?.get();
                println!("{}", serde_json::to_string_pretty(&identity)?);
                return Ok(());
            }
            "services" => {
                let identity = identifier_store(&resolve_data_dir())?.get();
                for service in ServiceKey::all() {
                    println!(
                        "{:<12} {:<16} {}",
                        service.key(),
                        service.display_name(),
                        service.endpoint(&identity)
                    );
                }
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("Lakay — app connectors and voice delivery server");
                println!();
                println!("Usage: lakay [command]");
                println!();
                println!("Commands:");
                println!("  (none)      Start the server");
                println!("  identity    Print the local user identity");
                println!("  services    List known services and their endpoints");
                println!("  help        Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'lakay help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let data_dir = resolve_data_dir();

    info!("Data directory: {}", data_dir.display());

    let config = lakay_core::LakayConfig::from_env(&data_dir);
    let state = Arc::new(AppState::new(config));

    // Push the persisted list to every sink so the runtime starts aligned.
    if let Err(e) = state.apps.store().sync().await {
        warn!("Initial connector sync incomplete: {}", e);
    }

    let app = routes::build_router(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Lakay server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
