pub mod types;
pub mod config;
pub mod data;
pub mod topology;
pub mod projection;
pub mod path;
pub mod scale;
pub mod legend;
pub mod scene;
pub mod spatial;
pub mod controller;
pub mod render;
pub mod server;
pub mod export;

#[cfg(test)]
mod fixtures;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth map to SVG
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `output.svg`
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Also write a standalone HTML page (overrides `output.html`)
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
    },
    /// Serve the map with hover tooltips
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Decode the topology and write counties/states as GeoJSON
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `output.geojson_dir`
        #[arg(short = 'd', long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, output, html } => {
            let mut app_config = config::AppConfig::load(&config)?;
            if let Some(svg) = output {
                app_config.output.svg = svg;
            }
            if html.is_some() {
                app_config.output.html = html;
            }

            // 1. Load both datasets
            let source = data::SourceRouter::new(app_config.input.timeout());
            let result = data::load(&source, &app_config.input.locations(), app_config.input.fetch_mode).await;
            let state = data::LoadState::from_result(result);

            // 2. Build the scene
            let mut map = controller::MapController::new(app_config.render.projection.build());
            let view = map.sync(&state);
            if let controller::View::Failed(message) = &view {
                anyhow::bail!("{message}");
            }

            // 3. Write outputs
            render::write_outputs(&app_config.output, &view, map.tooltip())?;
            println!("Map written to {:?}", app_config.output.svg);
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load(&config)?;
            server::start_server(app_config).await?;
        }
        Commands::Export { config, out_dir } => {
            let app_config = config::AppConfig::load(&config)?;
            let dir = out_dir.unwrap_or_else(|| app_config.output.geojson_dir.clone());

            let source = data::SourceRouter::new(app_config.input.timeout());
            let topology = match data::load_topology(&source, &app_config.input.topology).await {
                Ok(topology) => topology,
                Err(e) => {
                    tracing::warn!(error = %e, "topology unavailable");
                    anyhow::bail!("{}", data::LOAD_ERROR_MESSAGE);
                }
            };
            for path in export::export_collections(&topology, &dir)? {
                println!("Wrote {:?}", path);
            }
        }
    }

    Ok(())
}
