// src/aggregate.rs

use crate::accumulator::{parse_results, ApplySummary, SheetBatch, SheetWalker};
use crate::competitors::CompetitorRegistry;
use crate::config::Config;
use crate::model::Competitor;
use crate::source::{read_csv, ResultFileMeta, Sheet, SheetSource, SourceError};
use crate::stats::{compute_stats, reconcile_wins};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Running totals for the end-of-run summary
#[derive(Debug, Default, Clone, Copy)]
pub struct RunTotals {
    pub sources: usize,
    pub failed_sources: usize,
    pub rows_applied: usize,
    pub rows_skipped: usize,
    pub entries: usize,
}

impl RunTotals {
    fn add(&mut self, summary: ApplySummary) {
        self.sources += 1;
        self.rows_applied += summary.applied;
        self.rows_skipped += summary.skipped;
        self.entries += summary.entries;
    }
}

/// Drives every source into one competitor registry.
///
/// Sheets and files are parsed in parallel, then applied one batch at a time
/// in a fixed order, so the registry has a single writer and runs repeat exactly.
pub struct Aggregator {
    config: Config,
    registry: CompetitorRegistry,
    totals: RunTotals,
}

impl Aggregator {
    pub fn new(config: Config) -> Self {
        Self { config, registry: CompetitorRegistry::new(), totals: RunTotals::default() }
    }

    pub fn seed(&mut self, seeds: Vec<Competitor>) {
        let count = seeds.len();
        self.registry.seed(seeds);
        tracing::info!(records = count, competitors = self.registry.len(), "Seeded competitors");
    }

    pub fn totals(&self) -> RunTotals {
        self.totals
    }

    /// Every numerically named sheet, walked as one season
    pub fn ingest_workbook<S: SheetSource>(&mut self, source: &mut S) {
        let sheets = source.sheets();
        tracing::info!(sheets = sheets.len(), "Parsing season sheets");
        let batches: Vec<SheetBatch> = sheets.par_iter().map(|sheet| self.walk_sheet(sheet)).collect();
        self.apply_all(batches);
    }

    pub fn walk_sheet(&self, sheet: &Sheet) -> SheetBatch {
        SheetWalker::new(
            &sheet.grid,
            &sheet.name,
            sheet.year,
            &self.config.layout,
            self.config.matching.event_threshold,
        )
        .walk()
    }

    /// `<root>/<year>/<Event>Day <N>.csv`. Files that fail to read are dropped.
    pub fn ingest_results_dir(&mut self, root: &Path) -> Result<(), SourceError> {
        let files = discover_result_files(root)?;
        tracing::info!(root = %root.display(), files = files.len(), "Parsing result files");

        let bar = ProgressBar::new(files.len() as u64);
        bar.set_message("Parsing result files");

        let parsed: Vec<Result<SheetBatch, SourceError>> =
            files.par_iter().progress_with(bar.clone()).map(|path| self.parse_result_file(root, path)).collect();
        bar.finish_with_message("Result files parsed");

        let mut batches = Vec::with_capacity(parsed.len());
        for result in parsed {
            match result {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    self.totals.failed_sources += 1;
                    tracing::warn!("Dropping result file: {}", e);
                }
            }
        }
        self.apply_all(batches);
        Ok(())
    }

    fn parse_result_file(&self, root: &Path, path: &Path) -> Result<SheetBatch, SourceError> {
        let meta = ResultFileMeta::from_path(path)?;
        let grid = read_csv(path)?;
        let label = path.strip_prefix(root).unwrap_or(path).display().to_string();
        Ok(parse_results(&grid, &meta, &self.config.results, &label))
    }

    fn apply_all(&mut self, batches: Vec<SheetBatch>) {
        for batch in batches {
            let source = batch.source.clone();
            let summary = batch.apply(&mut self.registry);
            tracing::debug!(source = %source, applied = summary.applied, skipped = summary.skipped, "Batch applied");
            self.totals.add(summary);
        }
    }

    /// Orders by win count (descending, stable) and derives the statistics
    pub fn finish(self) -> Vec<Competitor> {
        let mut competitors = self.registry.into_competitors();
        competitors.sort_by(|a, b| b.wins.len().cmp(&a.wins.len()));
        for competitor in &mut competitors {
            reconcile_wins(competitor);
            compute_stats(competitor);
        }
        competitors
    }
}

/// CSV files exactly two levels below `root`, sorted by path
pub fn discover_result_files(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root).min_depth(2).max_depth(2).sort_by_file_name();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_csv = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
                if entry.file_type().is_file() && is_csv {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;
    use std::fs;
    use tempfile::TempDir;

    const NATIONALS_DAY_1: &str = "\
Women Elite,,
Place,Pos,Name
,1,\"DOE, JANE\"
,2,\"ROE, SARA\"
,4,\"POE, AMY\"
,,
";

    const NATIONALS_DAY_2: &str = "\
Women Elite,,
Place,Pos,Name
,1,\"ROE, SARA\"
,3,\"DOE, JANE\"
";

    const OVERFLOW: &str = "\
Women Pro,,
Place,Pos,Name
,1,\"DOE, JANE\"
,2,\"NEW, NOBODY\"
";

    fn results_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2018")).unwrap();
        fs::create_dir_all(dir.path().join("2019")).unwrap();
        fs::create_dir_all(dir.path().join("misc")).unwrap();
        fs::write(dir.path().join("2018/NationalsDay 1.csv"), NATIONALS_DAY_1).unwrap();
        fs::write(dir.path().join("2019/NationalsDay 2.csv"), NATIONALS_DAY_2).unwrap();
        fs::write(dir.path().join("2019/Spring Open Day 1.csv"), OVERFLOW).unwrap();
        fs::write(dir.path().join("2019/notes.txt"), "not results").unwrap();
        fs::write(dir.path().join("misc/Stray Day 1.csv"), NATIONALS_DAY_1).unwrap();
        dir
    }

    fn run(dir: &Path) -> (Vec<Competitor>, RunTotals) {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.ingest_results_dir(dir).unwrap();
        let totals = aggregator.totals();
        (aggregator.finish(), totals)
    }

    fn by_name<'a>(competitors: &'a [Competitor], name: &str) -> &'a Competitor {
        competitors.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn discovery_finds_csvs_two_levels_down() {
        let dir = results_tree();
        let files = discover_result_files(dir.path()).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| f.extension().unwrap() == "csv"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = discover_result_files(Path::new("/no/such/results"));
        assert!(matches!(result, Err(SourceError::NotADirectory(_))));
    }

    #[test]
    fn results_tree_aggregates_across_seasons() {
        let dir = results_tree();
        let (competitors, totals) = run(dir.path());

        assert_eq!(competitors.len(), 3);
        assert_eq!(totals.failed_sources, 1);
        assert_eq!(totals.rows_skipped, 1);

        let jane = by_name(&competitors, "Jane Doe");
        assert_eq!(jane.number_of_wins, 2);
        assert_eq!(jane.number_of_podiums, 3);
        assert_eq!(jane.number_of_mains, Some(3));
        assert_eq!(jane.seasons_active, Some(2));
        assert_eq!(jane.years_active.iter().copied().collect::<Vec<_>>(), vec![2018, 2019]);

        let amy = by_name(&competitors, "Amy Poe");
        assert_eq!(amy.number_of_mains, Some(1));
        assert_eq!(amy.win_percentage, crate::model::Ratio::Value(0.0));
    }

    #[test]
    fn output_is_ordered_by_wins_descending() {
        let dir = results_tree();
        let (competitors, _) = run(dir.path());
        let wins: Vec<u32> = competitors.iter().map(|c| c.number_of_wins).collect();
        let mut sorted = wins.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(wins, sorted);
        assert_eq!(competitors[0].name, "Jane Doe");
    }

    #[test]
    fn every_win_has_a_first_place_podium() {
        let dir = results_tree();
        let (competitors, _) = run(dir.path());
        for c in &competitors {
            assert_eq!(c.number_of_wins as usize, c.wins.len());
            assert_eq!(c.number_of_podiums as usize, c.podiums.len());
            for win in &c.wins {
                assert!(c.podiums.iter().any(|p| p.position == Some(1) && p.event.same_as(&win.event)));
            }
        }
    }

    #[test]
    fn rerunning_the_same_input_is_idempotent() {
        let dir = results_tree();
        let (first, _) = run(dir.path());
        let (second, _) = run(dir.path());

        let shape = |cs: &[Competitor]| -> Vec<(String, usize, usize, usize)> {
            cs.iter().map(|c| (c.name.clone(), c.wins.len(), c.podiums.len(), c.mains.len())).collect()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    struct FixedSheets(Vec<Sheet>);

    impl SheetSource for FixedSheets {
        fn sheets(&mut self) -> Vec<Sheet> {
            self.0.clone()
        }
    }

    #[test]
    fn workbook_then_results_share_one_registry() {
        let sheet = Sheet {
            name: "2017".into(),
            year: 2017,
            grid: grid![
                [],
                [],
                [],
                ["", "", "Nationals"],
                [],
                [],
                ["Jane Doe", "", 1],
                [],
                ["Main Events", "Nationals"],
                ["", "Day 1"],
                ["Jane Doe", 1],
                [],
                ["Main Events", "Nationals"],
                ["", "Day 1"],
                ["Jane Doe", 1],
            ],
        };

        let mut aggregator = Aggregator::new(Config::default());
        aggregator.ingest_workbook(&mut FixedSheets(vec![sheet]));
        let dir = results_tree();
        aggregator.ingest_results_dir(dir.path()).unwrap();
        let competitors = aggregator.finish();

        let jane = by_name(&competitors, "Jane Doe");
        assert_eq!(jane.number_of_wins, 3);
        assert_eq!(jane.seasons_active, Some(3));
        // the workbook podium was unplaced until reconciled against its win
        assert!(jane.podiums.iter().all(|p| p.position.is_some()));
    }

    #[test]
    fn seeded_mains_override_survives_aggregation() {
        let mut seed = Competitor::new("Amy Poe", 2016);
        seed.number_of_mains = Some(10);

        let mut aggregator = Aggregator::new(Config::default());
        aggregator.seed(vec![seed]);
        let dir = results_tree();
        aggregator.ingest_results_dir(dir.path()).unwrap();
        let competitors = aggregator.finish();

        let amy = by_name(&competitors, "Amy Poe");
        assert_eq!(amy.mains.len(), 1);
        assert_eq!(amy.number_of_mains, Some(10));
        assert_eq!(amy.years_active.iter().copied().collect::<Vec<_>>(), vec![2016, 2018]);
    }
}
