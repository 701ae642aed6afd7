use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use ejp_xml_pipeline::config::Config;
use ejp_xml_pipeline::logging;
use ejp_xml_pipeline::observability;
use ejp_xml_pipeline::pipeline::tasks::{transform_many, TransformParams};

const METRICS_FILENAME: &str = "metrics.prom";

#[derive(Parser)]
#[command(name = "ejp_xml_pipeline")]
#[command(about = "Transforms eJP XML export archives into JSON lines")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one or more archives from the source root
    Transform {
        /// Object keys of the archives, relative to the source root
        #[arg(required = true)]
        object_keys: Vec<String>,
        /// Configuration file (defaults to EJP_XML_CONFIG_FILE_PATH or config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory, overriding the configured one
        #[arg(long)]
        output_dir: Option<String>,
        /// Member filename exclusion pattern, overriding the configured one
        #[arg(long)]
        exclude: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Transform {
            object_keys,
            config,
            output_dir,
            exclude,
        } => {
            let config = Config::load(config.as_deref()).context("Failed to load configuration")?;
            let _guard = logging::init_logging(&config.logging);
            if let Err(e) = observability::init() {
                warn!("metrics disabled: {}", e);
            }
            info!(
                "transforming {} archives (deployment_env={})",
                object_keys.len(),
                config.deployment_env
            );

            let output_root = output_dir
                .clone()
                .unwrap_or_else(|| config.output.directory.clone());
            let params = object_keys
                .into_iter()
                .map(|object_key| TransformParams {
                    object_key,
                    output_dir: output_dir.clone(),
                    exclusion_pattern: exclude.clone(),
                })
                .collect();

            let results = transform_many(Arc::new(config), params).await;

            let metrics_path = PathBuf::from(&output_root).join(METRICS_FILENAME);
            match observability::write_rendered(&metrics_path) {
                Ok(true) => info!("metrics written to {}", metrics_path.display()),
                Ok(false) => {}
                Err(e) => warn!("failed to write {}: {}", metrics_path.display(), e),
            }

            let mut failed = 0;
            for result in &results {
                match result {
                    Ok(result) => {
                        println!("{}: {} documents", result.object_key, result.documents);
                        for (kind, count) in &result.records_by_kind {
                            println!("   {}: {}", kind, count);
                        }
                        println!("   output: {}", result.output_dir);
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{:#}", e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} archives failed", failed, results.len());
            }
        }
    }
    Ok(())
}
