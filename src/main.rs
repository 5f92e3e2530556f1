use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use env_logger::Env;
use mesh_masher::{
    config_loader::{Config, ConfigFileLoader, DEFAULT_CONFIG_PATH},
    importer::GltfImporter,
    manifest::Manifest,
    mesh_transform::MeshTransform,
    pipeline::Pipeline,
    texture::RasterDecoder,
};

const EXIT_INVALID_CONFIG: u8 = 1;
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    let mut config_loader = ConfigFileLoader::new(&config_path);
    let config = match config_loader.load_config() {
        Ok(config) => config.clone(),
        Err(err) => {
            log::error!("Invalid configuration {:?}: {}", config_path, err);
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let manifest = Manifest::read(&config.manifest)?;
    log::info!(
        "{} model files listed in {:?}",
        manifest.len(),
        config.manifest
    );

    let mesh_transform = MeshTransform::new(config.use_mesh_optimizer);
    log::info!(
        "Mesh transform: {:?}, {} worker threads",
        mesh_transform,
        config.worker_threads
    );
    let mut pipeline = Pipeline::new(
        config,
        Arc::new(GltfImporter::new()),
        Arc::new(RasterDecoder::new()),
        mesh_transform,
    )
    .context("Failed to start the worker threads")?;

    let summary = pipeline.run(&manifest)?;
    let report = pipeline.write_outputs(&config.output_dir)?;

    if !summary.skipped.is_empty() || !report.is_complete() {
        log::warn!(
            "Done with {} skipped files and {} skipped artifacts",
            summary.skipped.len(),
            report.failed.len()
        );
    } else {
        log::info!("Done, {} models written to {:?}", summary.processed.len(), config.output_dir);
    }
    Ok(())
}
