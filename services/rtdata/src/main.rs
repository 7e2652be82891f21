//! Near-real-time data products for glider and float missions.
//!
//! - Downloads CMEMS current products around the lead glider
//! - Reduces the model product to a 1000 m slice and a depth average
//! - Renders daily current overlays as KMZ
//! - Publishes glider positions, tracks and observation plots
//! - Extracts float positions from CTS5 alert e-mails

mod floats;
mod gliders;
mod overlays;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use cmems::{DownloadConfig, SubsetDownloader, SubsetRequest};
use current_processor::{process_currents, PipelineOptions};
use netcdf_io::NetCdfStore;
use platform_data::{C2Client, SLOCUM};
use rtdata_common::Config;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rtdata")]
#[command(about = "Near-real-time glider, float and ocean-current products")]
struct Args {
    /// YAML configuration file
    #[arg(long, global = true, env = "RTDATA_CONFIG", default_value = "config/rtdata.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Days of platform history to request from C2
    #[arg(long, global = true, default_value_t = 3)]
    since_days: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download CMEMS products around a glider and record them in the manifest
    Download {
        /// Reference glider unit (default: first configured glider)
        #[arg(long)]
        glider: Option<String>,
    },
    /// Extract the depth bin and depth average from the model product
    Process,
    /// Render daily current overlays as KMZ
    Overlays,
    /// Download, process and render in one go
    Currents {
        #[arg(long)]
        glider: Option<String>,
    },
    /// Latest glider positions as KML points
    Positions,
    /// One KML track per glider
    Tracks,
    /// Fetch observation time series as CSV
    Timeseries {
        /// Glider unit (default: every configured glider)
        #[arg(long)]
        glider: Option<String>,
    },
    /// Plot a saved observation CSV
    Plot {
        csv: PathBuf,
        /// Output directory (default: {save_path}/plots)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse CTS5 alert e-mails into a float position CSV
    FloatPosition {
        #[arg(required = true)]
        alerts: Vec<PathBuf>,
        /// Output CSV (default: {save_path}/floats/float_positions.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    if let Err(e) = run(&args, &config).await {
        let chain = format!("{:#}", e);
        error!(error = %chain, "Command failed");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: &Args, config: &Config) -> Result<()> {
    let since = Utc::now() - Duration::days(args.since_days);

    match &args.command {
        Command::Download { glider } => download(config, glider.as_deref(), args.since_days).await,
        Command::Process => process(config),
        Command::Overlays => render_overlays(config),
        Command::Currents { glider } => {
            download(config, glider.as_deref(), args.since_days).await?;
            process(config)?;
            render_overlays(config)
        }
        Command::Positions => {
            let client = c2_client(config)?;
            let output = config.save_path.join("datapoint.kml");
            gliders::write_positions(&client, &config.gliders, &since, &output).await
        }
        Command::Tracks => {
            let client = c2_client(config)?;
            let dir = config.save_path.join("glider_tracks");
            let written = gliders::write_tracks(&client, &config.gliders, &since, &dir).await?;
            info!(tracks = written.len(), dir = %dir.display(), "Wrote glider tracks");
            Ok(())
        }
        Command::Timeseries { glider } => {
            let client = c2_client(config)?;
            let units: Vec<&str> = match glider {
                Some(unit) => vec![unit.as_str()],
                None => config.gliders.iter().map(|g| g.unit.as_str()).collect(),
            };
            for unit in units {
                gliders::fetch_timeseries(&client, unit, &since, &config.save_path).await?;
            }
            Ok(())
        }
        Command::Plot { csv, output } => {
            let profiles = gliders::load_profiles(csv)?;
            let name = csv
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("CSV path has no file name")?;
            let dir = output.clone().unwrap_or_else(|| config.save_path.join("plots"));
            let written = gliders::plot_profiles(&profiles, &name, &dir)?;
            info!(transect = %written[0].display(), vars = %written[1].display(), "Wrote plots");
            Ok(())
        }
        Command::FloatPosition { alerts, output } => {
            let output = output
                .clone()
                .unwrap_or_else(|| config.save_path.join("floats").join("float_positions.csv"));
            floats::alerts_to_csv(alerts, &output)
        }
    }
}

fn c2_client(config: &Config) -> Result<C2Client> {
    C2Client::new(&config.c2).context("Failed to create C2 client")
}

async fn download(config: &Config, glider: Option<&str>, since_days: i64) -> Result<()> {
    let unit = match glider {
        Some(unit) => unit,
        None => config
            .gliders
            .first()
            .map(|g| g.unit.as_str())
            .context("No glider configured to centre the download on")?,
    };

    let client = c2_client(config)?;
    let since = Utc::now() - Duration::days(since_days);
    let (lat, lon) = client
        .get_positions(SLOCUM, unit, &since)
        .await
        .with_context(|| format!("Failed to fetch positions of {}", unit))?
        .last_coordinates()?;
    info!(unit, lat, lon, "Centring download on glider");

    let requests = SubsetRequest::around_position(&config.cmems, lat, lon, Utc::now().date_naive())?;
    let downloader =
        SubsetDownloader::new(DownloadConfig::from_cmems(&config.cmems, &config.save_path))?;
    let paths = downloader
        .download_all(&requests, &config.manifest_path())
        .await?;
    info!(files = paths.len(), "Downloads complete");
    Ok(())
}

fn process(config: &Config) -> Result<()> {
    let output = process_currents(&NetCdfStore, &PipelineOptions::from_config(config))
        .context("Current processing failed")?;
    info!(
        depth_bin = %output.depth_bin_path.display(),
        averaged = %output.averaged_path.display(),
        "Processing complete"
    );
    Ok(())
}

fn render_overlays(config: &Config) -> Result<()> {
    let written = overlays::produce_overlays(
        &NetCdfStore,
        &config.manifest_path(),
        &config.save_path,
        &config.overlay,
        &config.kmz_dir(),
    )?;
    info!(overlays = written.len(), dir = %config.kmz_dir().display(), "Overlays complete");
    Ok(())
}
