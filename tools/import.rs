use std::env;
use std::path::PathBuf;

use library::{config_path_from_env, import_paths, load_or_create_config, resolve_path, Library};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let inputs: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        return Err("usage: import <file|folder|playlist.xml>...".into());
    }

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Wrote default config to {:?}", config_path);
    }
    let root = resolve_path(&config_path, &config.library_root);
    let index_path = resolve_path(&config_path, &config.index_path);

    let library = Library::open(root, &index_path)?;
    let summary = import_paths(&library, &inputs)?;

    for failure in &summary.failures {
        warn!("Could not import {:?}: {}", failure.path, failure.error);
    }
    let stats = library.stats()?;

    println!(
        "Read {} records: {} added, {} already present, {} failed, {} skipped",
        summary.read,
        summary.added,
        summary.duplicates.len(),
        summary.failures.len(),
        summary.skipped
    );
    println!(
        "Indexed: {} tracks, {} artists, {} albums, {} anime",
        stats.tracks, stats.artists, stats.albums, stats.anime
    );

    Ok(())
}
