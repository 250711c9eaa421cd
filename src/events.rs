// src/events.rs

use crate::model::{Event, EventRef};
use crate::source::Grid;

/// Scores how likely `query` refers to `candidate`, in `[0, 1]`.
/// Both inputs arrive lowercased and trimmed.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Best of Jaro-Winkler over the whole label and the share of query tokens
/// found in the candidate, so both typos and abbreviated labels match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEditScorer;

impl SimilarityScorer for TokenEditScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let edit = strsim::jaro_winkler(query, candidate);

        let query_tokens: Vec<&str> = query.split_whitespace().collect();
        let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
        let coverage = if query_tokens.is_empty() {
            0.0
        } else {
            let found = query_tokens.iter().filter(|t| candidate_tokens.contains(t)).count();
            found as f64 / query_tokens.len() as f64
        };

        edit.max(coverage)
    }
}

/// The distinct events of one season
pub struct EventRegistry<S: SimilarityScorer = TokenEditScorer> {
    year: i32,
    events: Vec<EventRef>,
    scorer: S,
    threshold: f64,
}

impl EventRegistry<TokenEditScorer> {
    pub fn new(year: i32, threshold: f64) -> Self {
        Self::with_scorer(year, threshold, TokenEditScorer)
    }
}

impl<S: SimilarityScorer> EventRegistry<S> {
    pub fn with_scorer(year: i32, threshold: f64, scorer: S) -> Self {
        Self { year, events: Vec::new(), scorer, threshold }
    }

    /// Reads consecutive non-empty labels from `header_row`, starting at `first_column`
    pub fn from_header(grid: &Grid, header_row: usize, first_column: usize, year: i32, threshold: f64) -> Self
    where
        S: Default,
    {
        let mut registry = Self::with_scorer(year, threshold, S::default());
        let mut col = first_column;
        while let Some(label) = grid.cell(header_row, col).text() {
            registry.register(&label);
            col += 1;
        }
        registry
    }

    pub fn events(&self) -> &[EventRef] {
        &self.events
    }

    pub fn register(&mut self, name: &str) -> EventRef {
        let event = Event::new(name, self.year, None);
        self.events.push(event.clone());
        event
    }

    /// Best approximate match for `label`, first-registered wins on ties
    pub fn lookup(&self, label: &str) -> Option<EventRef> {
        let query = label.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &EventRef)> = None;
        for event in &self.events {
            let score = self.scorer.score(&query, &event.name.to_lowercase());
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, event));
            }
        }

        best.filter(|(score, _)| *score >= self.threshold).map(|(_, event)| event.clone())
    }

    /// Like [`lookup`](Self::lookup) but degrades to an "Unknown" event for the season
    pub fn resolve(&self, label: Option<&str>) -> EventRef {
        match label.and_then(|l| self.lookup(l)) {
            Some(event) => event,
            None => {
                tracing::debug!(year = self.year, label = ?label, "No matching event, using placeholder");
                Event::unknown(self.year)
            }
        }
    }
}
