// src/source.rs

use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("CSV decode error in {0}: {1}")]
    Csv(PathBuf, csv::Error),

    #[error("Workbook decode error in {0}: {1}")]
    Workbook(PathBuf, calamine::Error),

    #[error("Cannot derive season/event from path {0}")]
    PathMetadata(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// A decoded cell. No interpretation of the content happens at this layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed textual form, `None` for empty cells
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Lenient integer read: numbers truncate, text yields its leading signed digit run
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Cell::Number(_) => None,
            Cell::Text(s) => leading_integer(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(n as f64)
    }
}

pub(crate) fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Row-major grid of cells, indexed `[row][column]` from 0
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Out-of-range reads are empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }
}

/// Convenience for building grids in tests and adapters
#[macro_export]
macro_rules! grid {
    ($([$($cell:expr),* $(,)?]),* $(,)?) => {
        $crate::source::Grid::new(vec![$(vec![$($crate::source::Cell::from($cell)),*]),*])
    };
}

/// One season's worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub year: i32,
    pub grid: Grid,
}

/// Anything that yields season sheets as already-decoded grids
pub trait SheetSource {
    fn sheets(&mut self) -> Vec<Sheet>;
}

/// Sheet name parsed as a leading integer year; anything else is not a season
pub fn season_year(sheet_name: &str) -> Option<i32> {
    leading_integer(sheet_name).and_then(|y| i32::try_from(y).ok())
}

/// A spreadsheet workbook with one sheet per season
pub struct Workbook {
    path: PathBuf,
    sheets: calamine::Sheets<std::io::BufReader<std::fs::File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let sheets = open_workbook_auto(path).map_err(|e| SourceError::Workbook(path.to_path_buf(), e))?;
        Ok(Self { path: path.to_path_buf(), sheets })
    }
}

impl SheetSource for Workbook {
    fn sheets(&mut self) -> Vec<Sheet> {
        let mut out = Vec::new();
        for name in self.sheets.sheet_names() {
            let Some(year) = season_year(&name) else {
                tracing::debug!(sheet = %name, "Skipping non-season sheet");
                continue;
            };
            match self.sheets.worksheet_range(&name) {
                Ok(range) => out.push(Sheet { name, year, grid: range_to_grid(&range) }),
                Err(e) => {
                    tracing::warn!(file = %self.path.display(), sheet = %name, "Unable to read sheet: {}", e);
                }
            }
        }
        out
    }
}

fn range_to_grid(range: &calamine::Range<Data>) -> Grid {
    // The used range may start below/right of A1; pad so indices stay absolute
    let (row_off, col_off) = range.start().map_or((0, 0), |(r, c)| (r as usize, c as usize));
    let mut rows = vec![Vec::new(); row_off];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_off];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    Grid::new(rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from(s.as_str()),
        _ => Cell::Empty,
    }
}

/// Season and event identity carried by a CSV file's location
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFileMeta {
    pub year: i32,
    pub event_name: String,
    pub day: Option<u32>,
}

impl ResultFileMeta {
    /// `<root>/<year>/<EventName>Day <N>.csv`
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let bad_path = || SourceError::PathMetadata(path.to_path_buf());

        let year = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|d| d.to_str())
            .and_then(|d| d.trim().parse::<i32>().ok())
            .ok_or_else(bad_path)?;
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad_path)?;

        let marker = stem
            .rsplit_once("Day")
            .and_then(|(name, rest)| leading_integer(rest).and_then(|d| u32::try_from(d).ok()).map(|d| (name, d)));
        let (event_name, day) = match marker {
            Some((name, day)) => (name, Some(day)),
            None => (stem, None),
        };
        let event_name = event_name.trim().to_string();
        if event_name.is_empty() {
            return Err(bad_path());
        }

        Ok(Self { year, event_name, day })
    }
}

/// Reads a CSV file into a single implicit sheet
pub fn read_csv(path: &Path) -> Result<Grid, SourceError> {
    let bytes = std::fs::read(path).map_err(|e| SourceError::Io(path.to_path_buf(), e))?;
    parse_csv(&bytes).map_err(|e| SourceError::Csv(path.to_path_buf(), e))
}

pub fn parse_csv(bytes: &[u8]) -> Result<Grid, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect());
    }
    Ok(Grid::new(rows))
}
