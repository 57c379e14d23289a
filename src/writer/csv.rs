use anyhow::{Context, Result};
use std::path::Path;

use crate::model::GeoDataset;

/// Writes the attribute table as CSV: one header row of column names, then
/// one row per record. Geometry is not written.
#[derive(Default)]
pub struct CsvWriter {}

impl CsvWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, dataset: &GeoDataset, output_path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(output_path)
            .with_context(|| format!("Failed to create {:?}", output_path))?;

        writer
            .write_record(dataset.column_names())
            .context("Failed to write CSV header")?;

        for (row, record) in dataset.records().iter().enumerate() {
            writer
                .write_record(record.values.iter().map(|v| v.to_string()))
                .with_context(|| format!("Failed to write CSV row {}", row))?;
        }

        writer.flush().context("Failed to flush CSV file")?;

        tracing::info!(
            "Wrote {} rows x {} columns to {:?}",
            dataset.len(),
            dataset.columns().len(),
            output_path
        );
        Ok(())
    }
}
