mod csv;
mod png;
mod shapefile;

pub use self::csv::CsvWriter;
pub use self::png::PngWriter;
pub use self::shapefile::ShapefileWriter;

use std::path::{Path, PathBuf};

/// Appends `.{ext}` unless the path text already ends with it.
///
/// The check is a plain, case-sensitive suffix test: `out.txt` becomes
/// `out.txt.csv`, and `out.CSV` becomes `out.CSV.csv`.
pub fn with_default_extension(path: &Path, ext: &str) -> PathBuf {
    let suffix = format!(".{}", ext);
    if path.as_os_str().to_string_lossy().ends_with(&suffix) {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_os_string();
    raw.push(&suffix);
    PathBuf::from(raw)
}
