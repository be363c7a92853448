//! # HTML Minimizer - Main Entry Point
//!
//! Questo è il punto di ingresso dell'applicazione: esegue un pass di
//! ottimizzazione su una directory di output della build.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (INFO, o DEBUG con `--verbose`)
//! - Caricamento del file di configurazione e override da command line
//! - Caricamento della directory come asset graph, esecuzione del plugin, riscrittura dei risultati
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti e configura il logging
//! 2. Valida che la directory di output esista
//! 3. Costruisce `Config` (file, poi override) e il plugin
//! 4. Apre la result cache persistente per questa directory
//! 5. Esegue il pass con il numero di core della macchina
//! 6. Stampa listing, diagnostic e riepilogo; riscrive gli asset minimizzati
//! 7. Esce con errore se almeno un asset è fallito
//!
//! ## Esempio di utilizzo:
//! ```bash
//! html-minimizer ./dist --parallel 4 --config minimizer.json --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use html_minimizer::file_manager::FileManager;
use html_minimizer::optimizer::format_bytes;
use html_minimizer::progress::ProgressManager;
use html_minimizer::{
    AssetGraph, CacheStore, Config, Diagnostics, FileCacheStore, HtmlMinimizerPlugin, MemoryCacheStore,
    MinimizerRegistry, Parallel,
};

#[derive(Parser)]
#[command(name = "html-minimizer")]
#[command(about = "Minimize the HTML assets of a build output directory with result caching")]
struct Args {
    /// Build output directory
    output_directory: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker count (capped at cores - 1); 0 runs inline
    #[arg(short, long, conflicts_with = "no_parallel")]
    parallel: Option<i64>,

    /// Minimize on the coordinating task only
    #[arg(long)]
    no_parallel: bool,

    /// Dry run - don't write minimized assets back
    #[arg(long)]
    dry_run: bool,

    /// Print the pass report and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Don't read or write the persistent result cache
    #[arg(long)]
    no_cache: bool,

    /// Save the effective configuration to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.output_directory.is_dir() {
        return Err(anyhow::anyhow!(
            "Output directory does not exist: {}",
            args.output_directory.display()
        ));
    }

    let mut config = match &args.config {
        Some(path) if !path.exists() => {
            return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
        }
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    if args.no_parallel {
        config.parallel = Parallel::Enabled(false);
    } else if let Some(workers) = args.parallel {
        config.parallel = Parallel::Workers(workers);
    }
    config.validate()?;

    if let Some(path) = &args.save_config {
        config.save_to_file(path).await?;
        info!("Saved configuration to {}", path.display());
    }

    let file_cache = if args.no_cache {
        None
    } else {
        let root = args.output_directory.canonicalize()?;
        let store = FileCacheStore::for_output_dir(&root).await?;
        debug!("Result cache: {}", store.path().display());
        Some(Arc::new(store))
    };
    let store: Arc<dyn CacheStore> = match &file_cache {
        Some(store) => store.clone(),
        None => Arc::new(MemoryCacheStore::new()),
    };

    let plugin = HtmlMinimizerPlugin::new(&config, MinimizerRegistry::with_builtin(), store)?;

    let progress = if args.json {
        ProgressManager::hidden()
    } else {
        ProgressManager::spinner("Loading assets")
    };
    let assets = FileManager::load_assets(&args.output_directory).await?;
    progress.set_message(&format!(
        "Minimizing {} assets in {}",
        assets.len(),
        args.output_directory.display()
    ));

    let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let diagnostics = Diagnostics::new();
    let report = plugin.on_optimize_assets(&assets, &diagnostics, cpu_count).await;
    progress.finish(&format!("✓ {}", report.format_summary()));

    if args.json {
        let output = serde_json::json!({
            "report": report,
            "diagnostics": diagnostics.entries(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for asset in assets.list_assets() {
            if !plugin.filter().matches(&asset.name) {
                continue;
            }
            let flag = HtmlMinimizerPlugin::print_info(&asset.info)
                .map(|label| format!(" [{label}]"))
                .unwrap_or_default();
            println!(
                "  {} {}{}",
                asset.name,
                format_bytes(asset.content.len() as u64),
                flag
            );
        }
        for diagnostic in diagnostics.entries() {
            eprintln!("{}", diagnostic);
        }
    }

    if args.dry_run {
        info!("Dry run: {} assets left unchanged on disk", report.minimized);
    } else {
        let written = FileManager::write_minimized(&args.output_directory, &assets).await?;
        info!("Wrote {} minimized assets", written);
    }

    if let Some(store) = &file_cache {
        store.persist().await?;
    }

    let errors = diagnostics.errors().len();
    if errors > 0 {
        return Err(anyhow::anyhow!("{} error(s) while minimizing assets", errors));
    }

    Ok(())
}
