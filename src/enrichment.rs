/// Batch enrichment of billing rows with validated address data
///
/// Workflow:
/// 1. Drop rows without a state or zip code
/// 2. Resolve which address and city columns the sheet uses
/// 3. Build the composite address per row
/// 4. Validate + normalize each address on a bounded task pool
/// 5. Merge the normalized fields back and drop the excluded components
use crate::address_client::AddressValidationClient;
use crate::dataset::{Cell, Dataset, Row};
use crate::errors::{AppError, ResultExt};
use crate::models::{NormalizedRecord, ValidationResponse};
use crate::normalizer::normalize_response;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const STATE_COLUMN: &str = "BILLTOSTATE";
pub const ZIP_COLUMN: &str = "BILLTOZIPCODE";

/// Candidates in preference order.
pub const ADDRESS_COLUMNS: [&str; 4] = ["ADDRESS1", "ADDRESS2", "BILLTOADDRESS1", "BILLTOADDRESS2"];
pub const CITY_COLUMNS: [&str; 2] = ["BILLTOCITY", "CITY"];

pub const FULL_ADDRESS_COLUMN: &str = "full_address";
pub const RAW_RESPONSE_COLUMN: &str = "json_data";

/// Component columns removed from the enriched output.
pub const EXCLUDED_COLUMNS: [&str; 4] = [
    "subpremise",
    "subpremise_inferred",
    "point_of_interest",
    "point_of_interest_inferred",
];

/// Address and city columns chosen for a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub address_column: String,
    pub city_column: String,
}

/// First candidate present in the header, if any.
pub fn first_present(dataset: &Dataset, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|c| dataset.has_column(c))
        .map(|c| c.to_string())
}

/// Picks the address and city columns once for the whole dataset.
pub fn resolve_schema(dataset: &Dataset) -> Result<ResolvedSchema, AppError> {
    let address_column = first_present(dataset, &ADDRESS_COLUMNS).ok_or_else(|| {
        AppError::SchemaError(format!(
            "none of the address columns {:?} is present",
            ADDRESS_COLUMNS
        ))
    })?;
    let city_column = first_present(dataset, &CITY_COLUMNS).ok_or_else(|| {
        AppError::SchemaError(format!(
            "none of the city columns {:?} is present",
            CITY_COLUMNS
        ))
    })?;

    tracing::debug!(
        "Resolved schema: address={}, city={}",
        address_column,
        city_column
    );
    Ok(ResolvedSchema {
        address_column,
        city_column,
    })
}

/// True when both the state and the zip code are present.
pub fn has_required_fields(row: &Row) -> bool {
    !Dataset::cell(row, STATE_COLUMN).is_empty() && !Dataset::cell(row, ZIP_COLUMN).is_empty()
}

/// `"{address}, {city}, {state} {zip}"`
pub fn composite_address(row: &Row, schema: &ResolvedSchema) -> String {
    format!(
        "{}, {}, {} {}",
        Dataset::cell(row, &schema.address_column),
        Dataset::cell(row, &schema.city_column),
        Dataset::cell(row, STATE_COLUMN),
        Dataset::cell(row, ZIP_COLUMN),
    )
}

/// Original fields, then the composite address and raw reply, then the
/// normalized fields (which win on name collision), minus the excluded set.
pub fn merge_row(
    mut row: Row,
    full_address: String,
    raw: &serde_json::Value,
    record: NormalizedRecord,
) -> Row {
    row.insert(FULL_ADDRESS_COLUMN.to_string(), Cell::Text(full_address));
    row.insert(RAW_RESPONSE_COLUMN.to_string(), Cell::Text(raw.to_string()));
    for (key, value) in record {
        row.insert(key, Cell::from(value));
    }
    for name in EXCLUDED_COLUMNS {
        row.shift_remove(name);
    }
    row
}

/// Validates one composite address and flattens the reply.
async fn enrich_address(
    client: &AddressValidationClient,
    address: &str,
) -> Result<(serde_json::Value, NormalizedRecord), AppError> {
    let raw = client.validate_raw(address).await?;
    let response = ValidationResponse::from_value(&raw)?;
    Ok((raw, normalize_response(&response)))
}

/// Enriches every row that has a state and zip code.
///
/// Rows are validated concurrently, at most `concurrency` at a time, and
/// written back in input order. The first failing row aborts the batch and
/// cancels the rest.
pub async fn enrich(
    client: &AddressValidationClient,
    dataset: Dataset,
    concurrency: usize,
) -> Result<Dataset, AppError> {
    let schema = resolve_schema(&dataset)?;

    for column in [STATE_COLUMN, ZIP_COLUMN] {
        if !dataset.has_column(column) {
            tracing::warn!("Column {} is absent; every row will be skipped", column);
        }
    }

    let base_columns = dataset.columns().to_vec();
    let total = dataset.len();
    let rows: Vec<Row> = dataset
        .into_rows()
        .into_iter()
        .filter(has_required_fields)
        .collect();
    tracing::info!(
        "Enriching {} of {} rows ({} without state or zip code skipped)",
        rows.len(),
        total,
        total - rows.len()
    );

    let addresses: Vec<String> = rows
        .iter()
        .map(|row| composite_address(row, &schema))
        .collect();

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (idx, address) in addresses.iter().enumerate() {
        let client = client.clone();
        let semaphore = semaphore.clone();
        let address = address.clone();
        tasks.spawn(async move {
            // Semaphore is never closed; the permit is held until the call returns
            let _permit = semaphore.acquire_owned().await;
            enrich_address(&client, &address)
                .await
                .with_context(|| format!("row {} ({})", idx, address))
                .map(|enriched| (idx, enriched))
        });
    }

    let mut results: Vec<Option<(serde_json::Value, NormalizedRecord)>> = vec![None; rows.len()];
    let mut done = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (idx, enriched) =
            joined.map_err(|e| AppError::InternalError(format!("enrichment task failed: {}", e)))??;
        results[idx] = Some(enriched);
        done += 1;
        if done % 100 == 0 {
            tracing::info!("Validated {}/{} addresses", done, results.len());
        }
    }

    let mut merged = Vec::with_capacity(rows.len());
    for ((row, address), result) in rows.into_iter().zip(addresses).zip(results) {
        let (raw, record) = result.ok_or_else(|| {
            AppError::InternalError("enrichment task produced no result".to_string())
        })?;
        merged.push(merge_row(row, address, &raw, record));
    }

    let mut enriched = Dataset::from_rows(base_columns, merged);
    enriched.drop_columns(&EXCLUDED_COLUMNS);
    tracing::info!("✓ Enriched {} rows", enriched.len());
    Ok(enriched)
}
