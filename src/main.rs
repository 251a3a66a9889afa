use anyhow::{Context, Result};
use clap::Parser;
use planet_order::aoi::prepare_geometry;
use planet_order::download_plan::{deliver, Delivery};
use planet_order::planet::PlanetClient;
use planet_order::polling::{OrderPoller, TokioDelay};
use planet_order::request::{build_order, build_search_filter, write_document};
use planet_order::settings::Settings;
use planet_order::time_range::TimeRange;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search PlanetScope scenes over an area of interest, order them clipped to it and download the
/// delivered files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// First day of the acquisition window (YYYY-MM-DD)
    start_date: String,

    /// Last day of the acquisition window (YYYY-MM-DD)
    end_date: String,

    /// Area of interest (.shp, .kml, .json or .geojson)
    aoi: PathBuf,

    /// Planet API key
    api_key: String,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the download plan and the delivered files are written
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the search and order requests as .geojson documents to this directory
    #[arg(long)]
    save_requests: Option<PathBuf>,

    /// Prepare and save the search request without contacting the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<planet_order::Error>() {
                Some(cause) if cause.is_validation() => error!("Invalid input: {:#}", e),
                _ => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let settings = match &args.config {
        Some(path) => {
            info!("Loading settings from {:?}", path);
            Settings::read(path)
                .with_context(|| format!("Failed to load settings from {:?}", path))?
        }
        None => Settings::default(),
    };

    let time_range = TimeRange::parse(&args.start_date, &args.end_date)?;
    let aoi = prepare_geometry(&args.aoi)
        .with_context(|| format!("Failed to prepare AOI {:?}", args.aoi))?;
    let geometry = aoi.to_geojson();

    let search = build_search_filter(&geometry, &time_range, &settings.product);
    if let Some(dir) = &args.save_requests {
        fs::create_dir_all(dir)?;
        let path = write_document(&search, dir.join("search"))
            .context("Failed to save search request")?;
        info!("Search request written to {:?}", path);
    }

    if args.dry_run {
        info!("Dry run, nothing submitted");
        return Ok(ExitCode::SUCCESS);
    }

    let client = PlanetClient::new(&args.api_key, &settings.api)?;
    let ids = client.search(&search).await.context("Search failed")?;

    let order_request = build_order(&ids, &geometry, &settings.product);
    if let Some(dir) = &args.save_requests {
        let path = write_document(&order_request, dir.join("order"))
            .context("Failed to save order request")?;
        info!("Order request written to {:?}", path);
    }

    let poller = OrderPoller::new(settings.polling.clone());
    let outcome = poller
        .run(&client, &order_request, &TokioDelay)
        .await
        .context("Order failed")?;

    let delivery = deliver(outcome, &args.output_dir, &client)
        .await
        .context("Download failed")?;
    match &delivery {
        Delivery::Downloaded(report) => {
            info!(
                "{} file(s) downloaded, {} already present",
                report.downloaded.len(),
                report.already_present.len()
            );
            if !report.skipped.is_empty() {
                warn!(
                    "{} result(s) were not delivered: {}",
                    report.skipped.len(),
                    report.skipped.join(", ")
                );
            }
        }
        Delivery::Pending(order) => {
            println!(
                "Order {} is still {}. Try again later.",
                order.id, order.state
            );
        }
        Delivery::Failed(_) => {}
    }

    Ok(if delivery.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
