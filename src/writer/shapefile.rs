use anyhow::{Context, Result};
use gdal::vector::{Feature, FieldDefn, LayerAccess, LayerOptions, OGRwkbGeometryType};
use gdal::DriverManager;
use std::path::Path;

use crate::model::{GeoDataset, Value};

/// Writes geometries, attributes and the `.prj` of a dataset as an ESRI
/// Shapefile. An existing shapefile at the target path is replaced.
#[derive(Default)]
pub struct ShapefileWriter {}

impl ShapefileWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, dataset: &GeoDataset, output_path: &Path) -> Result<()> {
        let driver = DriverManager::get_driver_by_name("ESRI Shapefile")
            .context("Failed to get ESRI Shapefile driver")?;

        if output_path.exists() {
            driver
                .delete(output_path)
                .with_context(|| format!("Failed to replace existing {:?}", output_path))?;
        }

        let mut output = driver
            .create_vector_only(output_path)
            .context("Failed to create shapefile dataset")?;

        let layer_name = output_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("layer");

        // The driver takes its shape type from the layer; use the first
        // geometry's type and let the driver decide when there is none.
        let geometry_type = dataset
            .records()
            .iter()
            .find_map(|r| r.geometry.as_ref())
            .map(|g| g.geometry_type())
            .unwrap_or(OGRwkbGeometryType::wkbUnknown);

        let layer = output
            .create_layer(LayerOptions {
                name: layer_name,
                srs: dataset.crs().map(|c| c.spatial_ref()),
                ty: geometry_type,
                ..Default::default()
            })
            .context("Failed to create layer")?;

        for column in dataset.columns() {
            let field = FieldDefn::new(&column.name, column.kind.to_ogr())
                .with_context(|| format!("Failed to define field {}", column.name))?;
            if column.width > 0 {
                field.set_width(column.width);
            }
            if column.precision > 0 {
                field.set_precision(column.precision);
            }
            field
                .add_to_layer(&layer)
                .with_context(|| format!("Failed to add field {}", column.name))?;
        }

        let defn = layer.defn();
        for (row, record) in dataset.records().iter().enumerate() {
            let mut feature = Feature::new(defn).context("Failed to create feature")?;

            if let Some(geometry) = &record.geometry {
                feature
                    .set_geometry(geometry.clone())
                    .with_context(|| format!("Failed to set geometry of feature {}", row))?;
            }

            for (idx, value) in record.values.iter().enumerate() {
                let set = match value {
                    Value::Null => feature.set_field_null(idx),
                    Value::Integer(v) => feature.set_field_integer64(idx, *v),
                    Value::Real(v) => feature.set_field_double(idx, *v),
                    Value::Text(v) | Value::Date(v) | Value::DateTime(v) => {
                        feature.set_field_string(idx, v)
                    }
                };
                set.with_context(|| format!("Failed to set field {} of feature {}", idx, row))?;
            }

            feature
                .create(&layer)
                .with_context(|| format!("Failed to write feature {}", row))?;
        }

        tracing::info!(
            "Wrote {} features to {:?}",
            dataset.len(),
            output_path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{Crs, EpsgCode};
    use crate::model::{Column, ColumnKind, Record};
    use crate::reader::read_shapefile;
    use gdal::vector::Geometry;
    use tempfile::TempDir;

    fn init_gdal() -> bool {
        DriverManager::get_driver_by_name("ESRI Shapefile").is_ok()
    }

    fn create_test_dataset() -> GeoDataset {
        let columns = vec![
            Column::new("name", ColumnKind::Text),
            Column::new("count", ColumnKind::Integer),
            Column::new("ratio", ColumnKind::Real),
        ];
        let records = (0..4)
            .map(|i| {
                let x = i as f64 * 10.0;
                let wkt = format!(
                    "POLYGON (({x} 0,{x1} 0,{x1} 5,{x} 5,{x} 0))",
                    x = x,
                    x1 = x + 5.0
                );
                Record::new(
                    Some(Geometry::from_wkt(&wkt).unwrap()),
                    vec![
                        Value::Text(format!("cell-{}", i)),
                        Value::Integer(i),
                        Value::Real(i as f64 / 4.0),
                    ],
                )
            })
            .collect();
        let crs = Crs::from_epsg(EpsgCode::new(3857).unwrap()).unwrap();
        GeoDataset::new(columns, records, Some(crs)).unwrap()
    }

    #[test]
    fn test_write_and_read_back() {
        if !init_gdal() {
            eprintln!("Skipping test: ESRI Shapefile driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("cells.shp");

        let dataset = create_test_dataset();
        ShapefileWriter::new().write(&dataset, &output_path).unwrap();

        assert!(output_path.exists());
        assert!(temp_dir.path().join("cells.dbf").exists());
        assert!(temp_dir.path().join("cells.prj").exists());

        let loaded = read_shapefile(&output_path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(
            loaded.column_names().collect::<Vec<_>>(),
            vec!["name", "count", "ratio"]
        );
        assert_eq!(loaded.value(2, 0), &Value::Text("cell-2".into()));
        assert_eq!(loaded.value(3, 1), &Value::Integer(3));
        assert!(loaded.crs().is_some());

        let original = dataset.extent().unwrap();
        let restored = loaded.extent().unwrap();
        assert!((original.min_x - restored.min_x).abs() < 1e-9);
        assert!((original.max_x - restored.max_x).abs() < 1e-9);
        assert!((original.max_y - restored.max_y).abs() < 1e-9);
    }

    #[test]
    fn test_write_replaces_existing_file() {
        if !init_gdal() {
            eprintln!("Skipping test: ESRI Shapefile driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("cells.shp");
        let writer = ShapefileWriter::new();

        writer.write(&create_test_dataset(), &output_path).unwrap();
        writer.write(&create_test_dataset(), &output_path).unwrap();

        assert_eq!(read_shapefile(&output_path).unwrap().len(), 4);
    }
}
