use std::path::Path;

use gdal::vector::LayerAccess;
use gdal::Dataset;
use tracing::{debug, info};

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::model::{Column, ColumnKind, GeoDataset, Record, Value};

/// Reads the first layer of a vector file (normally an ESRI Shapefile).
///
/// Column order follows the layer definition; every feature becomes one
/// record, features without geometry included.
pub fn read_shapefile(path: &Path) -> Result<GeoDataset> {
    let dataset = Dataset::open(path)?;
    if dataset.layer_count() == 0 {
        return Err(Error::NoLayer(path.to_path_buf()));
    }
    let mut layer = dataset.layer(0)?;

    let columns: Vec<Column> = layer
        .defn()
        .fields()
        .map(|field| Column {
            name: field.name(),
            kind: ColumnKind::from_ogr(field.field_type()),
            width: field.width(),
            precision: field.precision(),
        })
        .collect();
    debug!("Layer columns: {:?}", columns);

    let crs = layer.spatial_ref().map(Crs::identify);

    let records: Vec<Record> = layer
        .features()
        .map(|feature| {
            let values = feature.fields().map(|(_, value)| Value::from(value)).collect();
            Record::new(feature.geometry().cloned(), values)
        })
        .collect();

    info!(
        "Read {} features with {} columns from {:?} (CRS: {})",
        records.len(),
        columns.len(),
        path,
        crs.as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "undefined".to_string())
    );

    GeoDataset::new(columns, records, crs)
}
