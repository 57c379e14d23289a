use anyhow::Result;
use std::path::Path;

use crate::render::{Canvas, RenderConfig};

/// Saves the canvas as a PNG at the configured size and resolution.
#[derive(Default)]
pub struct PngWriter {}

impl PngWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, canvas: &Canvas, config: &RenderConfig, output_path: &Path) -> Result<()> {
        let (cols, rows) = config.pixel_size();
        tracing::info!(
            "Rendering figure: {} x {} pixels at {} dpi",
            cols,
            rows,
            config.dpi
        );

        let raster = canvas.rasterize(config)?;
        raster.save_png(output_path)?;
        Ok(())
    }
}
