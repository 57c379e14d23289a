use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Shp,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "shp" => Ok(ExportFormat::Shp),
            "csv" => Ok(ExportFormat::Csv),
            other => bail!("Unknown export format: {} (expected png, shp or csv)", other),
        }
    }
}

/// One line typed into the shell.
///
/// Commands that take a path treat a missing path as a dismissed file
/// picker, so `import` on its own is a cancelled import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Import(Option<PathBuf>),
    Info { detailed: bool },
    Reproject(String),
    Table(Option<usize>),
    Clear,
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "import" | "open" | "load" => Command::Import(path_arg(rest)),
            "info" | "crs" => Command::Info {
                detailed: matches!(rest, "-v" | "--verbose" | "wkt"),
            },
            "reproject" | "to-crs" => Command::Reproject(rest.to_string()),
            "table" => {
                if rest.is_empty() {
                    Command::Table(None)
                } else {
                    match rest.parse() {
                        Ok(rows) => Command::Table(Some(rows)),
                        Err(_) => bail!("Row count must be a number: {}", rest),
                    }
                }
            }
            "clear" => Command::Clear,
            "export" | "save" => {
                let (format, path) = match rest.split_once(char::is_whitespace) {
                    Some((format, path)) => (format, path.trim()),
                    None => (rest, ""),
                };
                if format.is_empty() {
                    bail!("Usage: export png|shp|csv <path>");
                }
                Command::Export {
                    format: format.parse()?,
                    path: path_arg(path),
                }
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => bail!("Empty command"),
            other => bail!("Unknown command: {} (type `help` for a list)", other),
        };
        Ok(command)
    }
}

fn path_arg(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim_matches(|c| c == '"' || c == '\'');
    if raw.is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

pub const HELP: &str = "\
Commands:
  import <path>               load a shapefile (replaces the current one)
  info [wkt]                  show the projection (full WKT with `wkt`)
  reproject <epsg>            convert to another CRS, e.g. `reproject 4326`
  table [rows]                show the attribute table
  clear                       discard the loaded data
  export png|shp|csv <path>   save the figure, the data or the attributes
  status                      show the status line
  help                        show this list
  quit                        leave the shell";
