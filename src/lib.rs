pub mod crs;
pub mod error;
pub mod model;
pub mod reader;
pub mod render;
pub mod session;
pub mod table;
pub mod writer;

pub use crs::{Crs, EpsgCode};
pub use error::{Error, Result};
pub use model::{Column, ColumnKind, GeoDataset, Record, Value};
pub use render::{Canvas, RenderConfig};
pub use session::{Notice, Session, SessionState, Severity};
pub use table::{display_width, fit_cell, AttributeTable, TableSource};
pub use writer::{CsvWriter, PngWriter, ShapefileWriter};
