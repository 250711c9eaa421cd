// src/accumulator.rs

use crate::competitors::{CompetitorRegistry, OnMissing, PrintedName};
use crate::config::{LayoutConfig, ResultsConfig};
use crate::events::EventRegistry;
use crate::model::{Event, EventRef, PlacementResult, ResultEntry};
use crate::source::{Cell, Grid, ResultFileMeta};

/// Results parsed from one row, waiting to be attached to a competitor
#[derive(Debug, Clone)]
pub struct RiderRow {
    pub row: usize,
    pub name: PrintedName,
    pub on_missing: OnMissing,
    pub entries: Vec<ResultEntry>,
}

/// Everything one sheet or file contributes, in row order
#[derive(Debug, Clone)]
pub struct SheetBatch {
    pub source: String,
    pub year: i32,
    pub rows: Vec<RiderRow>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
    pub entries: usize,
}

impl SheetBatch {
    pub fn new(source: impl Into<String>, year: i32) -> Self {
        Self { source: source.into(), year, rows: Vec::new() }
    }

    /// Attaches every row to its competitor. Rows whose name does not resolve are skipped.
    pub fn apply(self, registry: &mut CompetitorRegistry) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for row in self.rows {
            match registry.resolve(&row.name, self.year, row.on_missing) {
                Some(competitor) => {
                    summary.applied += 1;
                    summary.entries += row.entries.len();
                    for entry in row.entries {
                        competitor.record(entry);
                    }
                }
                None => {
                    summary.skipped += 1;
                    tracing::info!(source = %self.source, row = row.row, name = ?row.name, "No known competitor, row skipped");
                }
            }
        }
        summary
    }
}

/// Which block of the season sheet a count row feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountKind {
    Main,
    Podium,
}

/// The event and day each column of a main-events/podium block refers to
#[derive(Debug, Clone)]
struct BlockColumns {
    targets: Vec<(usize, EventRef, u32)>,
}

#[derive(Debug, Clone)]
enum WalkState {
    ScanningHeader,
    InWinBlock,
    ScanningMainsMarker,
    InMainsBlock(BlockColumns),
    ScanningPodiumsMarker,
    InPodiumsBlock(BlockColumns),
    Done,
}

/// Walks a season worksheet's fixed layout:
/// header row, wins block, then two marker-led blocks (main events, podiums).
pub struct SheetWalker<'a> {
    grid: &'a Grid,
    layout: &'a LayoutConfig,
    events: EventRegistry,
    threshold: f64,
    batch: SheetBatch,
    cursor: usize,
    state: WalkState,
}

impl<'a> SheetWalker<'a> {
    pub fn new(grid: &'a Grid, source: &str, year: i32, layout: &'a LayoutConfig, threshold: f64) -> Self {
        Self {
            grid,
            layout,
            events: EventRegistry::new(year, threshold),
            threshold,
            batch: SheetBatch::new(source, year),
            cursor: 0,
            state: WalkState::ScanningHeader,
        }
    }

    pub fn walk(mut self) -> SheetBatch {
        loop {
            let state = std::mem::replace(&mut self.state, WalkState::Done);
            self.state = match state {
                WalkState::ScanningHeader => self.read_header(),
                WalkState::InWinBlock => self.win_row(),
                WalkState::ScanningMainsMarker => self.scan_marker(CountKind::Main),
                WalkState::InMainsBlock(columns) => self.count_row(CountKind::Main, columns),
                WalkState::ScanningPodiumsMarker => self.scan_marker(CountKind::Podium),
                WalkState::InPodiumsBlock(columns) => self.count_row(CountKind::Podium, columns),
                WalkState::Done => break,
            };
        }
        self.batch
    }

    fn year(&self) -> i32 {
        self.batch.year
    }

    fn read_header(&mut self) -> WalkState {
        self.events = EventRegistry::from_header(
            self.grid,
            self.layout.header_row,
            self.layout.event_column,
            self.year(),
            self.threshold,
        );
        if self.events.events().is_empty() {
            tracing::warn!(source = %self.batch.source, row = self.layout.header_row, "No event names in header row");
        }
        self.cursor = self.layout.wins_start_row;
        WalkState::InWinBlock
    }

    fn is_marker(&self, row: usize) -> bool {
        self.grid
            .cell(row, 0)
            .text()
            .is_some_and(|t| t.eq_ignore_ascii_case(self.layout.section_marker.trim()))
    }

    /// Name in the first cell, unless the row ends the block
    fn rider_name(&self, row: usize) -> Option<String> {
        if row >= self.grid.len() || self.is_marker(row) {
            return None;
        }
        self.grid.cell(row, 0).text()
    }

    fn win_row(&mut self) -> WalkState {
        let row = self.cursor;
        let Some(name) = self.rider_name(row) else {
            return WalkState::ScanningMainsMarker;
        };
        self.cursor += 1;

        let mut entries = Vec::new();
        for (i, event) in self.events.events().iter().enumerate() {
            let col = self.layout.event_column + i;
            for _ in 0..self.count_at(row, col) {
                entries.push(ResultEntry::Win(event.clone()));
            }
        }
        self.push_row(row, name, entries);
        WalkState::InWinBlock
    }

    fn scan_marker(&mut self, kind: CountKind) -> WalkState {
        while self.cursor < self.grid.len() {
            let row = self.cursor;
            self.cursor += 1;
            if self.is_marker(row) {
                let columns = self.block_columns(row, row + 1);
                self.cursor = row + 2;
                return match kind {
                    CountKind::Main => WalkState::InMainsBlock(columns),
                    CountKind::Podium => WalkState::InPodiumsBlock(columns),
                };
            }
        }
        tracing::warn!(
            source = %self.batch.source,
            year = self.year(),
            marker = %self.layout.section_marker,
            block = ?kind,
            "Section marker not found, block skipped"
        );
        WalkState::Done
    }

    fn count_row(&mut self, kind: CountKind, columns: BlockColumns) -> WalkState {
        let row = self.cursor;
        let Some(name) = self.rider_name(row) else {
            return match kind {
                CountKind::Main => WalkState::ScanningPodiumsMarker,
                CountKind::Podium => WalkState::Done,
            };
        };
        self.cursor += 1;

        let mut entries = Vec::new();
        for (col, event, day) in &columns.targets {
            for _ in 0..self.count_at(row, *col) {
                let placement = PlacementResult { event: event.clone(), day: *day, position: None };
                entries.push(match kind {
                    CountKind::Main => ResultEntry::Main(placement),
                    CountKind::Podium => ResultEntry::Podium(placement),
                });
            }
        }
        self.push_row(row, name, entries);

        match kind {
            CountKind::Main => WalkState::InMainsBlock(columns),
            CountKind::Podium => WalkState::InPodiumsBlock(columns),
        }
    }

    /// Multi-day events repeat across consecutive columns; a "Day N" column
    /// takes its event label from N-1 columns to the left.
    fn block_columns(&self, marker_row: usize, days_row: usize) -> BlockColumns {
        let width = self.grid.row(marker_row).map_or(0, |r| r.len());
        let targets = (1..width)
            .map(|col| {
                let day = self.day_at(days_row, col);
                let label = col
                    .checked_sub(day as usize - 1)
                    .filter(|&c| c >= 1)
                    .and_then(|c| self.grid.cell(marker_row, c).text());
                (col, self.events.resolve(label.as_deref()), day)
            })
            .collect();
        BlockColumns { targets }
    }

    fn day_at(&self, days_row: usize, col: usize) -> u32 {
        let Some(label) = self.grid.cell(days_row, col).text() else {
            return 1;
        };
        match label.split_whitespace().nth(1).and_then(|d| d.parse::<u32>().ok()) {
            Some(day) => day.max(1),
            None => {
                tracing::debug!(source = %self.batch.source, col, label = %label, "Unreadable day label, assuming day 1");
                1
            }
        }
    }

    fn count_at(&self, row: usize, col: usize) -> u32 {
        let cell = self.grid.cell(row, col);
        match cell.as_integer() {
            Some(n) if n <= 0 => 0,
            Some(n) => u32::try_from(n).unwrap_or_else(|_| {
                tracing::warn!(source = %self.batch.source, row, col, cell = ?cell, "Out-of-range count ignored");
                0
            }),
            None if cell.is_empty() => 0,
            None => {
                tracing::warn!(source = %self.batch.source, row, col, cell = ?cell, "Non-numeric count ignored");
                0
            }
        }
    }

    fn push_row(&mut self, row: usize, name: String, entries: Vec<ResultEntry>) {
        self.batch.rows.push(RiderRow {
            row,
            name: PrintedName::Display(name),
            on_missing: OnMissing::Create,
            entries,
        });
    }
}

/// Parses a per-event results CSV: the first section headed by a configured
/// category, one placement per row until the placement cell is empty.
pub fn parse_results(grid: &Grid, meta: &ResultFileMeta, results: &ResultsConfig, source: &str) -> SheetBatch {
    let mut batch = SheetBatch::new(source, meta.year);

    let Some((header_row, on_missing)) = find_section(grid, results) else {
        tracing::warn!(source = %source, category = %results.primary_category, "No matching results section");
        return batch;
    };

    let event = Event::new(meta.event_name.clone(), meta.year, meta.day);
    let day = meta.day.unwrap_or(1);

    // the row after the section header names the columns
    let mut row = header_row + 2;
    while row < grid.len() && !grid.cell(row, results.position_column).is_empty() {
        match placement_entries(grid, row, results, &event, day) {
            Ok((name, entries)) => batch.rows.push(RiderRow {
                row,
                name: PrintedName::Listing(name),
                on_missing,
                entries,
            }),
            Err(reason) => {
                let cells: Vec<&Cell> = grid.row(row).map(|r| r.iter().collect()).unwrap_or_default();
                tracing::warn!(source = %source, row, reason, cells = ?cells, "Unable to parse row");
            }
        }
        row += 1;
    }

    batch
}

fn find_section(grid: &Grid, results: &ResultsConfig) -> Option<(usize, OnMissing)> {
    let secondary = results.secondary_category.as_deref().map(str::trim).filter(|s| !s.is_empty());
    (0..grid.len()).find_map(|row| {
        let label = grid.cell(row, 0).text()?;
        if label.contains(results.primary_category.trim()) {
            Some((row, OnMissing::Create))
        } else if secondary.is_some_and(|s| label.contains(s)) {
            Some((row, OnMissing::Skip))
        } else {
            None
        }
    })
}

fn placement_entries(
    grid: &Grid,
    row: usize,
    results: &ResultsConfig,
    event: &EventRef,
    day: u32,
) -> Result<(String, Vec<ResultEntry>), &'static str> {
    let position = grid
        .cell(row, results.position_column)
        .as_integer()
        .and_then(|p| u32::try_from(p).ok())
        .filter(|&p| p >= 1)
        .ok_or("placement is not a positive integer")?;
    let name = grid.cell(row, results.name_column).text().ok_or("rider name is empty")?;

    let placement = PlacementResult { event: event.clone(), day, position: Some(position) };
    let mut entries = Vec::with_capacity(3);
    if position == 1 {
        entries.push(ResultEntry::Win(event.clone()));
    }
    if position <= 3 {
        entries.push(ResultEntry::Podium(placement.clone()));
    }
    entries.push(ResultEntry::Main(placement));

    Ok((name, entries))
}
