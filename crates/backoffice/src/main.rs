use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};

use brewery_backoffice::seed::Seed;
use brewery_infra::{BreweryConfig, BreweryServices};

const ENV_SEED_FILE: &str = "BREWERY_SEED_FILE";
const USAGE: &str = "usage: brewery-backoffice <seed.json> [YYYY-MM-DD]";

fn main() -> anyhow::Result<()> {
    brewery_observability::init();

    let mut args = std::env::args().skip(1);
    let seed_path = match args.next().or_else(|| std::env::var(ENV_SEED_FILE).ok()) {
        Some(path) => PathBuf::from(path),
        None => bail!("{USAGE}"),
    };
    let reference_date = match args.next() {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{raw}'; {USAGE}"))?,
        None => Utc::now().date_naive(),
    };

    let services = BreweryServices::in_memory(BreweryConfig::from_env());
    Seed::from_path(&seed_path)?.apply(&services)?;

    let report = services
        .sweep
        .run(reference_date)
        .context("expiry sweep failed")?;
    tracing::info!(
        date = %reference_date,
        cleared = report.cleared.len(),
        total_cleared = report.total_cleared,
        expiring_soon = report.expiring_soon.len(),
        "expiry sweep finished"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
