// src/competitors.rs

use crate::model::Competitor;
use std::collections::HashMap;

/// How a printed name arrived, which decides its canonical display form
#[derive(Debug, Clone, PartialEq)]
pub enum PrintedName {
    /// Used as printed, trimmed (workbook rows)
    Display(String),
    /// Raw results-listing field such as `"JANE DOE, MESA AZ"` or `"DOE, JANE"`, title-cased
    Listing(String),
}

impl PrintedName {
    pub fn canonical(&self) -> String {
        match self {
            PrintedName::Display(name) => name.split_whitespace().collect::<Vec<_>>().join(" "),
            PrintedName::Listing(raw) => canonical_listing_name(raw),
        }
    }
}

/// Whether an unmatched name may create a new competitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    Create,
    Skip,
}

/// The text before the first comma is the name, trailing text is a suffix
/// (`"JANE DOE, MESA AZ"` -> `"Jane Doe"`). A single token before the comma
/// is a surname: `"DOE, JANE"` -> `"Jane Doe"`.
pub fn canonical_listing_name(raw: &str) -> String {
    let ordered = match raw.split_once(',') {
        Some((head, tail)) if head.split_whitespace().count() == 1 && !tail.trim().is_empty() => {
            format!("{} {}", tail.trim(), head.trim())
        }
        Some((head, _)) => head.trim().to_string(),
        None => raw.trim().to_string(),
    };
    ordered.split_whitespace().map(title_case).collect::<Vec<_>>().join(" ")
}

fn title_case(token: &str) -> String {
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Matching key: case-insensitive, whitespace-collapsed
pub fn name_key(name: &str) -> String {
    name.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Canonical competitor records for a whole run, keyed by normalized name.
///
/// Find-or-create takes `&mut self`, so there is exactly one writer; parallel
/// parsers hand their rows to the owner instead of touching the registry.
#[derive(Debug, Default)]
pub struct CompetitorRegistry {
    competitors: Vec<Competitor>,
    index: HashMap<String, usize>,
}

impl CompetitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads known competitors. Later duplicates of a name are merged into the first.
    pub fn seed(&mut self, seeds: Vec<Competitor>) {
        for mut seed in seeds {
            let name = seed.name.clone();
            seed.set_name(&name);
            if seed.name.is_empty() {
                tracing::warn!("Skipping seed record with empty name");
                continue;
            }
            if seed.years_active.is_empty() {
                let years: Vec<i32> = seed.result_years().collect();
                seed.years_active.extend(years);
            }
            if seed.years_active.is_empty() {
                tracing::warn!(name = %seed.name, "Seed record has no active years and no results");
            }
            let key = name_key(&seed.name);
            match self.index.get(&key) {
                Some(&idx) => {
                    tracing::warn!(name = %seed.name, "Duplicate seed record merged");
                    let existing = &mut self.competitors[idx];
                    existing.years_active.extend(seed.years_active);
                    existing.wins.extend(seed.wins);
                    existing.podiums.extend(seed.podiums);
                    existing.mains.extend(seed.mains);
                    existing.number_of_mains = existing.number_of_mains.max(seed.number_of_mains);
                }
                None => {
                    self.index.insert(key, self.competitors.len());
                    self.competitors.push(seed);
                }
            }
        }
    }

    /// Resolves `name` for season `year`, creating a record when allowed.
    /// Every successful resolution marks the competitor active in `year`.
    pub fn resolve(&mut self, name: &PrintedName, year: i32, on_missing: OnMissing) -> Option<&mut Competitor> {
        let canonical = name.canonical();
        if canonical.is_empty() {
            return None;
        }
        let key = name_key(&canonical);

        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None if on_missing == OnMissing::Create => {
                tracing::debug!(name = %canonical, year, "New competitor");
                let idx = self.competitors.len();
                self.competitors.push(Competitor::new(&canonical, year));
                self.index.insert(key, idx);
                idx
            }
            None => return None,
        };

        let competitor = &mut self.competitors[idx];
        competitor.years_active.insert(year);
        Some(competitor)
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Competitor> {
        self.index.get(&name_key(name)).map(|&idx| &self.competitors[idx])
    }

    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    /// Competitors in first-seen order
    pub fn into_competitors(self) -> Vec<Competitor> {
        self.competitors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("DOE, JANE", "Jane Doe")]
    #[case("  mcdonald ,  mary ann ", "Mary Ann Mcdonald")]
    #[case("JANE DOE", "Jane Doe")]
    #[case("DOE,", "Doe")]
    #[case("JANE DOE, MESA AZ", "Jane Doe")]
    #[case("JANE DOE, USA", "Jane Doe")]
    #[case("MARY ANN MCDONALD, CA", "Mary Ann Mcdonald")]
    fn listing_names_are_reordered_and_title_cased(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(canonical_listing_name(raw), expected);
    }

    #[rstest]
    #[case("Jane Doe")]
    #[case(" jane doe ")]
    #[case("JANE DOE")]
    #[case("Jane   Doe")]
    fn matching_ignores_case_and_whitespace(#[case] printed: &str) {
        let mut registry = CompetitorRegistry::new();
        let first = registry.resolve(&PrintedName::Display("Jane Doe".into()), 2018, OnMissing::Create).unwrap().id;
        let again = registry.resolve(&PrintedName::Display(printed.into()), 2019, OnMissing::Create).unwrap();

        assert_eq!(again.id, first);
        assert_eq!(again.name, "Jane Doe");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listing_and_display_forms_meet_on_the_same_record() {
        let mut registry = CompetitorRegistry::new();
        let id = registry.resolve(&PrintedName::Display("Jane Doe".into()), 2018, OnMissing::Create).unwrap().id;
        let found = registry.resolve(&PrintedName::Listing("DOE, JANE".into()), 2019, OnMissing::Skip).unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn resolution_records_every_season() {
        let mut registry = CompetitorRegistry::new();
        registry.resolve(&PrintedName::Display("Jane Doe".into()), 2017, OnMissing::Create);
        registry.resolve(&PrintedName::Display("jane doe".into()), 2019, OnMissing::Create);

        let jane = registry.get("Jane Doe").unwrap();
        assert_eq!(jane.years_active.iter().copied().collect::<Vec<_>>(), vec![2017, 2019]);
    }

    #[test]
    fn listing_with_location_suffix_meets_the_sheet_name() {
        let mut registry = CompetitorRegistry::new();
        let id = registry.resolve(&PrintedName::Display("Jane Doe".into()), 2018, OnMissing::Create).unwrap().id;
        let found = registry.resolve(&PrintedName::Listing("JANE DOE, MESA AZ".into()), 2019, OnMissing::Create).unwrap();
        assert_eq!(found.id, id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn skip_mode_never_creates() {
        let mut registry = CompetitorRegistry::new();
        assert!(registry.resolve(&PrintedName::Listing("ROE, JILL".into()), 2019, OnMissing::Skip).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn blank_names_resolve_to_nothing() {
        let mut registry = CompetitorRegistry::new();
        assert!(registry.resolve(&PrintedName::Display("   ".into()), 2019, OnMissing::Create).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn seed_without_years_takes_them_from_its_results() {
        let json = r#"[{"name": "Amy Poe", "mains": [{"event": {"name": "Nationals", "year": 2014}, "day": 1}]}]"#;
        let seeds: Vec<Competitor> = serde_json::from_str(json).unwrap();

        let mut registry = CompetitorRegistry::new();
        registry.seed(seeds);
        let amy = registry.get("Amy Poe").unwrap();
        assert_eq!(amy.years_active.iter().copied().collect::<Vec<_>>(), vec![2014]);
    }

    #[test]
    fn seeds_keep_ids_and_merge_duplicates() {
        let mut a = Competitor::new("Jane Doe", 2015);
        a.number_of_mains = Some(4);
        let a_id = a.id;
        let mut b = Competitor::new("JANE DOE", 2016);
        b.number_of_mains = Some(9);

        let mut registry = CompetitorRegistry::new();
        registry.seed(vec![a, b]);

        assert_eq!(registry.len(), 1);
        let jane = registry.resolve(&PrintedName::Display("jane doe".into()), 2019, OnMissing::Skip).unwrap();
        assert_eq!(jane.id, a_id);
        assert_eq!(jane.number_of_mains, Some(9));
        assert_eq!(jane.years_active.len(), 3);
    }
}
