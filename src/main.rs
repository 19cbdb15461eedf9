use anyhow::Context;
use clap::Parser;
use seismo_stream::adapters::{
    BlockingExtractor, CsvStationCatalog, DescribedDatabase, HttpEventClient,
    HttpTravelTimeClient,
};
use seismo_stream::utils::{logger, validation::Validate};
use seismo_stream::{CliConfig, RawSeismogramParams, SeismogramEngine, ServiceConfig};
use std::sync::Arc;

fn build_engine(config: &ServiceConfig) -> anyhow::Result<SeismogramEngine> {
    let database = config
        .database
        .as_ref()
        .context("the configuration needs a [database] section to plan requests")?;

    let extractor = BlockingExtractor::new(
        DescribedDatabase::new(database.info()),
        config.extraction_workers(),
    );
    tracing::debug!("Extraction pool sized to {} workers", extractor.available_workers());

    let mut engine = SeismogramEngine::new(Arc::new(extractor))
        .with_default_label(config.default_label())
        .with_max_receivers(config.max_receivers());

    if let Some(events) = &config.events {
        engine = engine.with_events(Arc::new(HttpEventClient::new(
            events.endpoint.clone(),
            events.timeout_seconds(),
        )?));
    }
    if let Some(travel_times) = &config.travel_times {
        engine = engine.with_travel_times(Arc::new(HttpTravelTimeClient::new(
            travel_times.endpoint.clone(),
            travel_times.timeout_seconds(),
        )?));
    }
    if let Some(stations) = &config.stations {
        let catalog = CsvStationCatalog::from_path(&stations.catalog_path)
            .with_context(|| format!("loading station catalog {}", stations.catalog_path))?;
        tracing::debug!("Station catalog holds {} entries", catalog.len());
        engine = engine.with_stations(Arc::new(catalog));
    }
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting seismo-stream request planner");

    cli.validate()?;
    let config = ServiceConfig::from_file(&cli.config)
        .with_context(|| format!("reading configuration {}", cli.config))?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    let engine = build_engine(&config)?;
    let raw = RawSeismogramParams::from_query(&cli.query);
    let plan = match raw {
        Ok(raw) => engine.plan(&raw).await,
        Err(e) => Err(e),
    };

    match plan {
        Ok(plan) => {
            let skipped = plan.receivers.iter().filter(|r| r.window.is_none()).count();
            tracing::info!(
                "Resolved {} receivers ({} would be skipped)",
                plan.receivers.len(),
                skipped
            );
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "Request rejected: {} (category {:?}, status {})",
                e,
                e.category(),
                e.status_code()
            );
            eprintln!("{} {}", e.status_code(), e.client_message());
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }
}
