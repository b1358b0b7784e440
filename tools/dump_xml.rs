use std::env;
use std::path::PathBuf;

use library::{config_path_from_env, export_playlist, load_or_create_config, resolve_path, Library};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, _) = load_or_create_config(&config_path)?;
    let root = resolve_path(&config_path, &config.library_root);
    let index_path = resolve_path(&config_path, &config.index_path);

    let output = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| resolve_path(&config_path, &config.export_path));

    let library = Library::open(root, &index_path)?;
    let written = export_playlist(&library, &output)?;

    println!("Exported {} tracks to {}", written, output.display());
    Ok(())
}
