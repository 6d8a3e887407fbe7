use billing_address_validator::address_client::AddressValidationClient;
use billing_address_validator::config::Config;
use billing_address_validator::dataset::{self, Dataset};
use billing_address_validator::enrichment;
use billing_address_validator::models::AddressInput;
use billing_address_validator::normalizer;
use billing_address_validator::report;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "billing-address-validator")]
#[command(about = "Validate billing addresses and report on their quality", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a billing spreadsheet with validated address fields.
    Enrich {
        /// Input .xlsx/.xls/.ods/.csv file (falls back to BILLING_DATA_PATH).
        input: Option<PathBuf>,

        /// Only read the first N data rows.
        #[arg(long)]
        max_rows: Option<usize>,

        /// Where to save the enriched table.
        #[arg(short = 'o', long, default_value = "addresses")]
        output: PathBuf,

        /// Skip writing the enriched table.
        #[arg(long)]
        no_save: bool,

        /// Where to write the chart report.
        #[arg(long, default_value = "report.html")]
        report: PathBuf,
    },
    /// Render the chart report from a previously saved table.
    Report {
        #[arg(short = 'i', long, default_value = "addresses")]
        input: PathBuf,

        #[arg(short = 'o', long, default_value = "report.html")]
        out: PathBuf,
    },
    /// Validate a single free-text address and print the flattened fields.
    Validate { address: String },
}

fn write_report(dataset: &Dataset, out: &Path) -> anyhow::Result<()> {
    let report = report::build_report(dataset)?;
    let html = report::render_html(&report)?;
    std::fs::write(out, html)?;
    tracing::info!("Report written to {}", out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billing_address_validator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Enrich {
            input,
            max_rows,
            output,
            no_save,
            report,
        } => {
            let config = Config::from_env()?;
            let client = AddressValidationClient::new(&config)?;

            let input = input
                .or_else(|| std::env::var_os("BILLING_DATA_PATH").map(PathBuf::from))
                .ok_or_else(|| {
                    anyhow::anyhow!("input path required (argument or BILLING_DATA_PATH)")
                })?;

            let rows = dataset::read_spreadsheet(&input, max_rows)?;
            let enriched = enrichment::enrich(&client, rows, config.concurrency).await?;
            if enriched.is_empty() {
                tracing::warn!("No row has both a state and a zip code; nothing was validated");
            }

            if !no_save {
                dataset::write_csv(&enriched, &output)?;
            }
            write_report(&enriched, &report)?;
        }
        Commands::Report { input, out } => {
            let saved = dataset::read_csv(&input, None)?;
            if saved.is_empty() {
                tracing::warn!("{} has no data rows", input.display());
            }
            write_report(&saved, &out)?;
        }
        Commands::Validate { address } => {
            let config = Config::from_env()?;
            let client = AddressValidationClient::new(&config)?;
            let record = normalizer::normalize(&client, AddressInput::Text(address)).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
