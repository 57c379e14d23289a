use anyhow::{Context, Result};
use gdal::raster::{rasterize, Buffer, RasterCreationOptions, RasterizeOptions};
use gdal::vector::{Geometry, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager};
use std::path::Path;
use tracing::debug;

use crate::model::{Extent, GeoDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    /// Default fill colour for features.
    pub const STEEL_BLUE: Rgb = Rgb(0x1f, 0x77, 0xb4);
}

/// Figure settings. Defaults describe an 8x6 inch figure saved at 300 dpi.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    /// Blank border around the data, as a fraction of each figure side.
    pub margin: f64,
    pub background: Rgb,
    pub fill: Rgb,
    pub edge: Rgb,
    pub point_radius_px: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width_in: 8.0,
            height_in: 6.0,
            dpi: 300,
            margin: 0.05,
            background: Rgb::WHITE,
            fill: Rgb::STEEL_BLUE,
            edge: Rgb::BLACK,
            point_radius_px: 3.0,
        }
    }
}

impl RenderConfig {
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Pixel dimensions `(cols, rows)`, never smaller than 1x1.
    pub fn pixel_size(&self) -> (usize, usize) {
        let dpi = self.dpi as f64;
        let cols = (self.width_in * dpi).round().max(1.0) as usize;
        let rows = (self.height_in * dpi).round().max(1.0) as usize;
        (cols, rows)
    }

    /// Geotransform placing `extent` centred in the figure at equal aspect.
    pub fn geo_transform(&self, extent: &Extent) -> [f64; 6] {
        let (cols, rows) = self.pixel_size();
        let usable = (1.0 - 2.0 * self.margin).max(0.1);

        // A single point or a straight axis-aligned line has no area to fit.
        let width = if extent.width() > 0.0 { extent.width() } else { 1.0 };
        let height = if extent.height() > 0.0 { extent.height() } else { 1.0 };

        let res = (width / (cols as f64 * usable)).max(height / (rows as f64 * usable));
        let (cx, cy) = extent.center();

        [
            cx - cols as f64 * res / 2.0,
            res,
            0.0,
            cy + rows as f64 * res / 2.0,
            0.0,
            -res,
        ]
    }
}

/// Snapshot of the geometries currently drawn on the canvas.
#[derive(Clone)]
pub struct Scene {
    geometries: Vec<Geometry>,
    extent: Option<Extent>,
}

impl Scene {
    fn from_dataset(dataset: &GeoDataset) -> Self {
        Self {
            geometries: dataset
                .records()
                .iter()
                .filter_map(|r| r.geometry.clone())
                .collect(),
            extent: dataset.extent(),
        }
    }

    pub fn feature_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }
}

/// The drawing surface. Holds at most one scene, which always mirrors the
/// session's current dataset.
#[derive(Default)]
pub struct Canvas {
    scene: Option<Scene>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, dataset: &GeoDataset) {
        let scene = Scene::from_dataset(dataset);
        debug!(
            "Canvas redrawn: {} geometries, extent {:?}",
            scene.feature_count(),
            scene.extent()
        );
        self.scene = Some(scene);
    }

    pub fn clear(&mut self) {
        self.scene = None;
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_none()
    }

    /// Rasterizes the current scene into an in-memory RGB image.
    pub fn rasterize(&self, config: &RenderConfig) -> Result<Raster> {
        let (cols, rows) = config.pixel_size();

        let driver = DriverManager::get_driver_by_name("MEM").context("Failed to get MEM driver")?;
        let mut dataset = driver
            .create_with_band_type::<u8, _>("", cols, rows, 3)
            .context("Failed to create in-memory raster")?;

        let bg = config.background;
        for (index, value) in [(1, bg.0), (2, bg.1), (3, bg.2)] {
            let mut band = dataset
                .rasterband(index)
                .with_context(|| format!("Failed to get raster band {}", index))?;
            let mut buffer = Buffer::new((cols, rows), vec![value; cols * rows]);
            band.write((0, 0), (cols, rows), &mut buffer)
                .with_context(|| format!("Failed to paint background of band {}", index))?;
        }

        let Some(scene) = &self.scene else {
            return Ok(Raster { dataset });
        };
        let Some(extent) = scene.extent else {
            return Ok(Raster { dataset });
        };

        let transform = config.geo_transform(&extent);
        dataset
            .set_geo_transform(&transform)
            .context("Failed to set geo transform")?;

        let mut layers = Layers::default();
        for geometry in &scene.geometries {
            layers.collect(geometry)?;
        }

        let radius = config.point_radius_px * transform[1];
        let markers = layers
            .points
            .iter()
            .map(|p| p.buffer(radius, 8))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to build point markers")?;

        burn(&mut dataset, &layers.areas, config.fill, false)?;
        burn(&mut dataset, &layers.outlines, config.edge, true)?;
        burn(&mut dataset, &layers.lines, config.fill, true)?;
        burn(&mut dataset, &markers, config.fill, true)?;

        Ok(Raster { dataset })
    }
}

/// Scene geometries sorted by how they are painted.
#[derive(Default)]
struct Layers {
    areas: Vec<Geometry>,
    outlines: Vec<Geometry>,
    lines: Vec<Geometry>,
    points: Vec<Geometry>,
}

impl Layers {
    fn collect(&mut self, geometry: &Geometry) -> Result<()> {
        match geometry.geometry_name().as_str() {
            "POLYGON" => {
                self.areas.push(geometry.clone());
                self.push_rings(geometry)?;
            }
            "MULTIPOLYGON" => {
                self.areas.push(geometry.clone());
                for i in 0..geometry.geometry_count() {
                    self.push_rings(&geometry.get_geometry(i))?;
                }
            }
            "LINESTRING" | "MULTILINESTRING" => self.lines.push(geometry.clone()),
            "POINT" | "MULTIPOINT" => self.points.push(geometry.clone()),
            "GEOMETRYCOLLECTION" => {
                for i in 0..geometry.geometry_count() {
                    self.collect(&geometry.get_geometry(i))?;
                }
            }
            other => debug!("Skipping unsupported geometry type {}", other),
        }
        Ok(())
    }

    fn push_rings(&mut self, polygon: &Geometry) -> Result<()> {
        for i in 0..polygon.geometry_count() {
            let ring = polygon.get_geometry(i);
            let mut line = Geometry::empty(OGRwkbGeometryType::wkbLineString)
                .context("Failed to create outline geometry")?;
            let mut points = Vec::new();
            ring.get_points(&mut points);
            for (x, y, _) in points {
                line.add_point_2d((x, y));
            }
            self.outlines.push(line);
        }
        Ok(())
    }
}

fn burn(dataset: &mut Dataset, geometries: &[Geometry], color: Rgb, all_touched: bool) -> Result<()> {
    if geometries.is_empty() {
        return Ok(());
    }

    for (band, value) in [(1, color.0), (2, color.1), (3, color.2)] {
        let burn_values = vec![value as f64; geometries.len()];
        let options = RasterizeOptions {
            all_touched,
            ..Default::default()
        };
        rasterize(dataset, &[band], geometries, &burn_values, Some(options))
            .with_context(|| format!("Failed to rasterize into band {}", band))?;
    }
    Ok(())
}

/// A rendered RGB image held in memory.
pub struct Raster {
    dataset: Dataset,
}

impl Raster {
    /// `(cols, rows)`
    pub fn size(&self) -> (usize, usize) {
        self.dataset.raster_size()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Result<Rgb> {
        let mut channels = [0u8; 3];
        for (i, channel) in channels.iter_mut().enumerate() {
            let band = self
                .dataset
                .rasterband(i + 1)
                .with_context(|| format!("Failed to get raster band {}", i + 1))?;
            let buffer = band
                .read_as::<u8>((x as isize, y as isize), (1, 1), (1, 1), None)
                .context("Failed to read pixel")?;
            *channel = buffer.data()[0];
        }
        Ok(Rgb(channels[0], channels[1], channels[2]))
    }

    /// Writes the image through GDAL's PNG driver.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let driver = DriverManager::get_driver_by_name("PNG").context("Failed to get PNG driver")?;
        self.dataset
            .create_copy(&driver, path, &RasterCreationOptions::new())
            .with_context(|| format!("Failed to write PNG {:?}", path))?;
        Ok(())
    }
}
