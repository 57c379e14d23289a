mod commands;

use anyhow::Result;
use clap::Parser;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use shpview::{fit_cell, Notice, RenderConfig, Session, SessionState, Severity, TableSource};
use std::io::{self, BufRead, IsTerminal};
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::info;

use crate::commands::{Command, ExportFormat, HELP};

/// Widest a grid cell is printed before it is cut.
const MAX_CELL_WIDTH: usize = 32;

const HISTORY_SIZE: usize = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Shapefile to load at startup
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Reproject the loaded data to this EPSG code
    #[arg(long, value_name = "CODE")]
    epsg: Option<String>,

    /// Save the rendered figure as PNG and exit
    #[arg(long, value_name = "FILE")]
    png: Option<PathBuf>,

    /// Save the data as an ESRI Shapefile and exit
    #[arg(long, value_name = "FILE")]
    shp: Option<PathBuf>,

    /// Save the attribute table as CSV and exit
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Resolution of exported PNG figures
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Rows printed by `table` when no count is given
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

impl Args {
    fn is_batch(&self) -> bool {
        self.png.is_some() || self.shp.is_some() || self.csv.is_some()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut session = Session::with_config(RenderConfig::default().with_dpi(args.dpi));

    if args.is_batch() {
        return run_batch(&args, &mut session);
    }
    prepare(&args, &mut session);
    run_shell(&mut session, args.rows)
}

/// Loads and reprojects whatever the arguments name. Returns the notices
/// that were not successes.
fn prepare(args: &Args, session: &mut Session) -> Vec<Notice> {
    let mut failures = Vec::new();
    if let Some(input) = &args.input {
        failures.extend(report(session.import(Some(input))));
    }
    if let Some(code) = &args.epsg {
        failures.extend(report(session.reproject(code)));
    }
    failures
}

/// Runs every requested step, then fails if any of them did.
fn run_batch(args: &Args, session: &mut Session) -> Result<()> {
    let mut failures = prepare(args, session);

    if let Some(path) = &args.png {
        failures.extend(report(session.export_png(Some(path))));
    }
    if let Some(path) = &args.shp {
        failures.extend(report(session.export_shapefile(Some(path))));
    }
    if let Some(path) = &args.csv {
        failures.extend(report(session.export_csv(Some(path))));
    }

    if !failures.is_empty() {
        anyhow::bail!("{} operations failed", failures.len());
    }
    Ok(())
}

/// Prints a notice; hands it back when it is not a success.
fn report(notice: Notice) -> Option<Notice> {
    match notice.severity {
        Severity::Info => println!("{}", notice),
        Severity::Warning | Severity::Error => eprintln!("{}", notice),
    }
    (!notice.is_ok()).then_some(notice)
}

fn run_shell(session: &mut Session, default_rows: usize) -> Result<()> {
    info!("Starting shell; type `help` for commands");
    println!("{}", session.status());

    // Piped input gets no prompt and no line editing.
    if io::stdin().is_terminal() {
        run_interactive(session, default_rows)
    } else {
        run_piped(session, io::stdin().lock(), default_rows)
    }
}

fn run_interactive(session: &mut Session, default_rows: usize) -> Result<()> {
    let mut editor = create_editor()?;
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("shpview".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        match editor.read_line(&prompt)? {
            Signal::Success(line) => {
                if execute_line(session, &line, default_rows).is_break() {
                    break;
                }
            }
            Signal::CtrlC => println!("^C"),
            Signal::CtrlD => break,
        }
    }

    Ok(())
}

fn run_piped<R: BufRead>(session: &mut Session, input: R, default_rows: usize) -> Result<()> {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                eprintln!("Skipping unreadable input line: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if execute_line(session, &line, default_rows).is_break() {
            break;
        }
    }
    Ok(())
}

fn create_editor() -> Result<Reedline> {
    let history_path = std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".shpview_history");
    let history = FileBackedHistory::with_file(HISTORY_SIZE, history_path)
        .map_err(|e| anyhow::anyhow!("Failed to open shell history: {}", e))?;

    Ok(Reedline::create().with_history(Box::new(history)))
}

/// Parses and runs one shell line. Breaks on `quit`.
fn execute_line(session: &mut Session, line: &str, default_rows: usize) -> ControlFlow<()> {
    if line.trim().is_empty() {
        return ControlFlow::Continue(());
    }

    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return ControlFlow::Continue(());
        }
    };

    match command {
        Command::Import(path) => {
            report(session.import(path.as_deref()));
        }
        Command::Info { detailed } => {
            report(session.projection_info(detailed));
        }
        Command::Reproject(code) => {
            report(session.reproject(&code));
        }
        Command::Table(rows) => show_table(session, rows.unwrap_or(default_rows)),
        Command::Clear => {
            report(session.clear());
        }
        Command::Export { format, path } => {
            let path = path.as_deref();
            report(match format {
                ExportFormat::Png => session.export_png(path),
                ExportFormat::Shp => session.export_shapefile(path),
                ExportFormat::Csv => session.export_csv(path),
            });
        }
        Command::Status => println!("{}", session.status()),
        Command::Help => println!("{}", HELP),
        Command::Quit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

fn show_table(session: &Session, max_rows: usize) {
    if session.state() == SessionState::Empty {
        report(Notice::warning("No dataset has been loaded yet."));
        return;
    }

    let table = session.attribute_table();
    for line in grid_lines(&table, max_rows) {
        println!("{}", line);
    }
    println!(
        "({} of {} rows, {} columns)",
        table.row_count().min(max_rows),
        table.row_count(),
        table.column_count()
    );
}

/// Header, rule and the first `max_rows` rows, every line the same width.
fn grid_lines<T: TableSource>(table: &T, max_rows: usize) -> Vec<String> {
    let widths = table.column_widths(MAX_CELL_WIDTH, max_rows);
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = vec![format_row(&table.headers(), &widths), rule];
    for row in 0..table.row_count().min(max_rows) {
        lines.push(format_row(&table.row(row), &widths));
    }
    lines
}

fn format_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| fit_cell(cell.as_ref(), width))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::vector::Geometry;
    use gdal::DriverManager;
    use shpview::{display_width, Column, ColumnKind, Crs, EpsgCode, GeoDataset, Record, Value};
    use std::path::Path;
    use tempfile::TempDir;

    struct Cities;

    impl TableSource for Cities {
        fn row_count(&self) -> usize {
            2
        }

        fn column_count(&self) -> usize {
            2
        }

        fn cell(&self, row: usize, col: usize) -> String {
            [["北京市", "1"], ["Paris", "2"]][row][col].to_string()
        }

        fn header(&self, col: usize) -> &str {
            ["name", "id"][col]
        }
    }

    fn write_fixture(dir: &Path) -> PathBuf {
        let records = (0..3)
            .map(|i| {
                Record::new(
                    Some(Geometry::from_wkt(&format!("POINT ({} 4400000)", 440_000 + i * 1_000)).unwrap()),
                    vec![Value::Integer(i)],
                )
            })
            .collect();
        let crs = Crs::from_epsg(EpsgCode::new(32650).unwrap()).unwrap();
        let dataset =
            GeoDataset::new(vec![Column::new("id", ColumnKind::Integer)], records, Some(crs)).unwrap();

        let path = dir.join("points.shp");
        shpview::ShapefileWriter::new().write(&dataset, &path).unwrap();
        path
    }

    fn drivers_available() -> bool {
        ["ESRI Shapefile", "MEM", "PNG"]
            .iter()
            .all(|name| DriverManager::get_driver_by_name(name).is_ok())
    }

    #[test]
    fn test_format_row_pads_cells() {
        let widths = [4, 6];
        assert_eq!(format_row(&["id", "name"], &widths), "id   | name  ");
        assert_eq!(
            format_row(&["1", "POLYGON ((0 0,1 0,1 1,0 0))"], &widths),
            "1    | POL..."
        );
    }

    #[test]
    fn test_grid_lines_align_wide_characters() {
        let lines = grid_lines(&Cities, 10);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "name   | id");
        assert_eq!(lines[2], "北京市 | 1 ");
        let width = display_width(&lines[0]);
        for line in &lines {
            assert_eq!(display_width(line), width, "{:?}", line);
        }
        assert_eq!(lines[2].find('|'), Some(10));
    }

    #[test]
    fn test_execute_line() {
        let mut session = Session::new();

        assert!(execute_line(&mut session, "", 5).is_continue());
        assert!(execute_line(&mut session, "frobnicate", 5).is_continue());
        assert!(execute_line(&mut session, "reproject 4326", 5).is_continue());
        assert_eq!(session.status(), "Warning: No dataset has been loaded yet.");
        assert!(execute_line(&mut session, "import", 5).is_continue());
        assert_eq!(session.status(), "Operation cancelled");
        assert!(execute_line(&mut session, "quit", 5).is_break());
    }

    #[test]
    fn test_piped_input_skips_unreadable_lines() {
        let input: &[u8] = b"reproject 4326\n\xff\xfe\nimport\nquit\nclear\n";
        let mut session = Session::new();

        run_piped(&mut session, input, 5).unwrap();

        // `import` after the bad line ran; `clear` after `quit` did not.
        assert_eq!(session.status(), "Operation cancelled");
    }

    #[test]
    fn test_batch_without_input_fails() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.csv");
        let args = Args::try_parse_from(["shpview", "--csv", out.to_str().unwrap()]).unwrap();
        assert!(args.is_batch());

        let mut session = Session::new();
        assert!(run_batch(&args, &mut session).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_batch_exports() {
        if !drivers_available() {
            eprintln!("Skipping test: required GDAL drivers not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let input = write_fixture(temp_dir.path());
        let csv = temp_dir.path().join("attributes");
        let shp = temp_dir.path().join("projected");
        let args = Args::try_parse_from([
            "shpview",
            input.to_str().unwrap(),
            "--epsg",
            "4326",
            "--csv",
            csv.to_str().unwrap(),
            "--shp",
            shp.to_str().unwrap(),
        ])
        .unwrap();

        let mut session = Session::new();
        run_batch(&args, &mut session).unwrap();

        assert!(temp_dir.path().join("attributes.csv").exists());
        assert!(temp_dir.path().join("projected.shp").exists());
        assert_eq!(session.projection_info(false).message, "EPSG:4326");
    }

    #[test]
    fn test_batch_keeps_going_after_a_failure() {
        if !drivers_available() {
            eprintln!("Skipping test: required GDAL drivers not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let input = write_fixture(temp_dir.path());
        let csv = temp_dir.path().join("attributes.csv");
        let args = Args::try_parse_from([
            "shpview",
            input.to_str().unwrap(),
            "--epsg",
            "abc",
            "--csv",
            csv.to_str().unwrap(),
        ])
        .unwrap();

        let mut session = Session::new();
        let err = run_batch(&args, &mut session).unwrap_err();

        assert_eq!(err.to_string(), "1 operations failed");
        assert!(csv.exists());
    }
}
