//! Session controller: owns the one loaded dataset and the canvas drawn
//! from it.
//!
//! Every operation catches its own failures and hands back a [`Notice`]
//! for the user; nothing here returns an error to the caller.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::crs::{self, EpsgCode};
use crate::model::GeoDataset;
use crate::reader::read_shapefile;
use crate::render::{Canvas, RenderConfig};
use crate::table::AttributeTable;
use crate::writer::{with_default_extension, CsvWriter, PngWriter, ShapefileWriter};

const READY: &str = "Ready";
const CANCELLED: &str = "Operation cancelled";
const NO_DATASET: &str = "No dataset has been loaded yet.";
const UNDEFINED_PROJECTION: &str = "Undefined projection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Status-line message: success or a cancelled operation.
    Info,
    /// Refused or rolled back; the dataset is unchanged.
    Warning,
    /// The operation was attempted and failed.
    Error,
}

/// User-facing outcome of a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Info
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => f.write_str(&self.message),
            Severity::Warning => write!(f, "Warning: {}", self.message),
            Severity::Error => write!(f, "Error: {}", self.message),
        }
    }
}

pub struct Session {
    dataset: Option<GeoDataset>,
    source: Option<PathBuf>,
    canvas: Canvas,
    config: RenderConfig,
    status: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            dataset: None,
            source: None,
            canvas: Canvas::new(),
            config,
            status: READY.to_string(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.dataset.is_some() {
            SessionState::Loaded
        } else {
            SessionState::Empty
        }
    }

    pub fn dataset(&self) -> Option<&GeoDataset> {
        self.dataset.as_ref()
    }

    /// Path the current dataset was imported from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Text of the status line, updated by every operation.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn attribute_table(&self) -> AttributeTable<'_> {
        AttributeTable::new(self.dataset.as_ref())
    }

    /// Loads a shapefile, replacing whatever was loaded before. `None` means
    /// the user dismissed the file picker.
    pub fn import(&mut self, path: Option<&Path>) -> Notice {
        let Some(path) = path else {
            return self.report(Notice::info(CANCELLED));
        };

        let notice = match read_shapefile(path) {
            Ok(dataset) => {
                self.canvas.draw(&dataset);
                self.dataset = Some(dataset);
                self.source = Some(path.to_path_buf());
                Notice::info(format!("Loaded: {}", display_name(path)))
            }
            Err(e) => {
                self.discard();
                Notice::error(e.to_string())
            }
        };
        self.report(notice)
    }

    /// Text form of the dataset's CRS, `EPSG:<code>` when the authority is
    /// known. With `detailed` the full WKT is returned instead.
    pub fn projection_info(&mut self, detailed: bool) -> Notice {
        let notice = match self.dataset.as_ref().map(GeoDataset::crs) {
            None => Notice::warning(NO_DATASET),
            Some(None) => Notice::info(UNDEFINED_PROJECTION),
            Some(Some(crs)) if detailed => match crs.to_pretty_wkt() {
                Ok(wkt) => Notice::info(wkt),
                Err(e) => Notice::error(format!("Failed to get projection info: {}", e)),
            },
            Some(Some(crs)) => Notice::info(crs.to_string()),
        };
        self.report(notice)
    }

    /// Reprojects the dataset to the CRS named by `code`. The code must be
    /// a positive integer; anything else is rejected before any transform.
    /// A transform that fails part way keeps the dataset as it was.
    pub fn reproject(&mut self, code: &str) -> Notice {
        let Some(dataset) = self.dataset.as_ref() else {
            return self.report(Notice::warning(NO_DATASET));
        };
        let code: EpsgCode = match code.parse() {
            Ok(code) => code,
            Err(_) => return self.report(Notice::warning("Invalid EPSG code.")),
        };

        let notice = match crs::reproject(dataset, code) {
            Ok(dataset) => {
                self.canvas.draw(&dataset);
                self.dataset = Some(dataset);
                Notice::info(format!("Projection switched to {}", code))
            }
            Err(e) => Notice::warning(format!("Failed to switch projection: {}", e)),
        };
        self.report(notice)
    }

    pub fn clear(&mut self) -> Notice {
        self.discard();
        self.report(Notice::info("Data cleared"))
    }

    pub fn export_png(&mut self, path: Option<&Path>) -> Notice {
        self.export(path, "png", "Image", |_, canvas, config, path| {
            PngWriter::new().write(canvas, config, path)
        })
    }

    pub fn export_shapefile(&mut self, path: Option<&Path>) -> Notice {
        self.export(path, "shp", "SHP file", |dataset, _, _, path| {
            ShapefileWriter::new().write(dataset, path)
        })
    }

    pub fn export_csv(&mut self, path: Option<&Path>) -> Notice {
        self.export(path, "csv", "CSV file", |dataset, _, _, path| {
            CsvWriter::new().write(dataset, path)
        })
    }

    fn export<F>(&mut self, path: Option<&Path>, ext: &str, label: &str, write: F) -> Notice
    where
        F: FnOnce(&GeoDataset, &Canvas, &RenderConfig, &Path) -> anyhow::Result<()>,
    {
        let notice = match (self.dataset.as_ref(), path) {
            (None, _) => Notice::warning(NO_DATASET),
            (Some(_), None) => Notice::info(CANCELLED),
            (Some(dataset), Some(path)) => {
                let path = with_default_extension(path, ext);
                match write(dataset, &self.canvas, &self.config, &path) {
                    Ok(()) => Notice::info(format!("{} saved as: {}", label, display_name(&path))),
                    Err(e) => Notice::error(format!(
                        "Failed to export {}: {:#}",
                        label.to_lowercase(),
                        e
                    )),
                }
            }
        };
        self.report(notice)
    }

    fn discard(&mut self) {
        self.dataset = None;
        self.source = None;
        self.canvas.clear();
    }

    fn report(&mut self, notice: Notice) -> Notice {
        match notice.severity {
            Severity::Info => info!("{}", notice.message),
            Severity::Warning => warn!("{}", notice.message),
            Severity::Error => error!("{}", notice.message),
        }
        self.status = notice.to_string();
        notice
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
