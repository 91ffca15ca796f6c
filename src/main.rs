use clap::Parser;
use listing_harvest::config::HarvestConfig;
use listing_harvest::{CancelFlag, Harvest, export, utils};

mod args;
use args::Args;

/// Environment variable holding comma-separated proxy keys
const PROXY_KEYS_ENV: &str = "HARVEST_PROXY_KEYS";

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        ::log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> listing_harvest::Result<()> {
    let base = match &args.config {
        Some(path) => HarvestConfig::from_file(path)?,
        None => HarvestConfig::default(),
    };
    let config = args.apply(base, std::env::var(PROXY_KEYS_ENV).ok());
    config.validate()?;

    let harvest = Harvest::new(args.url.as_str()).with_config(config.clone());
    if args.classify_only {
        println!("{}", harvest.endpoint()?);
        return Ok(());
    }

    ::log::info!(
        "Starting harvest of {} ({} products)",
        args.url,
        config.pagination.target_count
    );

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::warn!("Interrupted, finishing after the current page");
            on_interrupt.cancel();
        }
    });

    let start_time = std::time::Instant::now();
    let report = harvest.with_cancel_flag(cancel).run().await?;

    let out = args.out.clone().unwrap_or_else(|| {
        utils::default_output_path(
            &report.endpoint.label(),
            config.pagination.target_count,
            config.output.delimiter,
        )
    });
    let written = export::write_file(&out, &report.records, &config.output)?;

    ::log::info!(
        "Harvest complete - {} page(s) in {:.2} seconds, stopped: {}",
        report.pages_fetched,
        start_time.elapsed().as_secs_f64(),
        report.stop_reason
    );
    println!("Wrote {} products to {}", written, out.display());
    Ok(())
}
