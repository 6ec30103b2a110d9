use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use incident_geocoder::config::Config;
use incident_geocoder::dataset::Dataset;
use incident_geocoder::location::{CoordinateResolver, NominatimGeocoder, OverrideTable};
use incident_geocoder::pipeline;
use incident_geocoder::store::BlobStore;
use std::path::PathBuf;

/// Incident Geocoder: adds latitude/longitude to incident records by city and state.
///
/// Examples:
///   incident-geocoder enrich --input fatal-police-shootings-data.csv
///   incident-geocoder enrich --input data.csv --offline --csv-out data-coords.csv
///   incident-geocoder summary
///   incident-geocoder export --csv-out data-coords.csv
#[derive(Parser)]
#[command(name = "incident-geocoder", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults to ./incident-geocoder.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Blob path, overriding the configured one.
    #[arg(long, global = true)]
    blob: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Geocode a CSV, apply the correction tables and save the blob.
    Enrich {
        /// Input CSV with `city` and `state` columns.
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Also write the enriched table as CSV.
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Offline mode: no geocoding requests, only the correction tables.
        #[arg(long)]
        offline: bool,

        /// Extra corrections (JSON array of {city, state, lat, lon}), applied last.
        #[arg(long)]
        overrides: Option<PathBuf>,
    },
    /// Print record counts of the saved blob.
    Summary,
    /// Reload the saved blob and write it as CSV.
    Export {
        #[arg(long)]
        csv_out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::try_load_from_file_or_default(cli.config.as_deref())?;
    if let Some(blob) = cli.blob {
        config.blob_path = blob;
    }
    let store = BlobStore::new(config.blob_path.clone());

    match cli.command {
        Command::Enrich {
            input,
            csv_out,
            offline,
            overrides,
        } => {
            let mut dataset = Dataset::from_csv_path(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;

            let extra = match overrides.or_else(|| config.extra_overrides.clone()) {
                Some(path) => Some(OverrideTable::from_json_path(path)?),
                None => None,
            };

            let geocoder = NominatimGeocoder::with_endpoint(
                config.geocoding.endpoint.clone(),
                config.geocoding.user_agent.clone(),
            );
            let mut resolver = CoordinateResolver::new(geocoder, config.resolve_options(offline));
            pipeline::enrich(&mut dataset, &mut resolver, extra.as_ref());

            store.save(&dataset)?;
            if let Some(path) = csv_out {
                dataset
                    .to_csv_path(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                log::info!("Wrote {}", path.display());
            }
            println!("{}", dataset.summary());
        }
        Command::Summary => {
            let dataset = store.load()?;
            println!("{}", dataset.summary());
        }
        Command::Export { csv_out } => {
            let dataset = store.load()?;
            dataset
                .to_csv_path(&csv_out)
                .with_context(|| format!("Failed to write {}", csv_out.display()))?;
            log::info!("Wrote {} records to {}", dataset.len(), csv_out.display());
        }
    }

    Ok(())
}
