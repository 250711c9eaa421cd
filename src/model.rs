// src/model.rs

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Uniquely identifies a competitor across the whole run
pub type CompetitorId = Uuid;

/// Events are shared read-only between every result that references them
pub type EventRef = Arc<Event>;

/// A named competition held in a specific year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Event {
    pub fn new(name: impl Into<String>, year: i32, day: Option<u32>) -> EventRef {
        let name: String = name.into();
        Arc::new(Event { name: name.trim().to_string(), year, day })
    }

    /// Stand-in for a label that could not be resolved against the season's events
    pub fn unknown(year: i32) -> EventRef {
        Event::new("Unknown", year, None)
    }

    /// Structural identity: name and year
    pub fn same_as(&self, other: &Event) -> bool {
        self.year == other.year && self.name == other.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinResult {
    pub event: EventRef,
}

/// A main-event or podium finish. Workbook sources carry no placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementResult {
    pub event: EventRef,
    pub day: u32,
    #[serde(default)]
    pub position: Option<u32>,
}

/// A single fact extracted from a source row, not yet attached to a competitor
#[derive(Debug, Clone)]
pub enum ResultEntry {
    Win(EventRef),
    Podium(PlacementResult),
    Main(PlacementResult),
}

/// A percentage that may be non-numeric when the denominator is zero
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Ratio {
    Value(f64),
    #[default]
    NotANumber,
}

impl Ratio {
    /// `part / whole * 100`, rounded to two decimals
    pub fn percentage(part: u32, whole: u32) -> Ratio {
        let raw = part as f64 / whole as f64 * 100.0;
        if raw.is_finite() {
            Ratio::Value((raw * 100.0).round() / 100.0)
        } else {
            Ratio::NotANumber
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ratio::Value(v) => serializer.serialize_f64(*v),
            Ratio::NotANumber => serializer.serialize_str("NaN"),
        }
    }
}

/// A rider with accumulated career results and derived statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    #[serde(default = "Uuid::new_v4")]
    pub id: CompetitorId,
    pub name: String,
    #[serde(default, skip_deserializing)]
    pub first_name: String,
    #[serde(default, skip_deserializing)]
    pub last_name: String,
    #[serde(default)]
    pub years_active: BTreeSet<i32>,
    #[serde(default)]
    pub wins: Vec<WinResult>,
    #[serde(default)]
    pub podiums: Vec<PlacementResult>,
    #[serde(default)]
    pub mains: Vec<PlacementResult>,

    #[serde(default, skip_deserializing)]
    pub number_of_wins: u32,
    #[serde(default, skip_deserializing)]
    pub number_of_podiums: u32,
    /// May be pre-seeded with a known count larger than what the sources hold
    #[serde(default)]
    pub number_of_mains: Option<u32>,
    #[serde(default, skip_deserializing)]
    pub seasons_active: Option<u32>,
    #[serde(default, skip_deserializing)]
    pub win_percentage: Ratio,
    #[serde(default, skip_deserializing)]
    pub podium_percentage: Ratio,
}

impl Competitor {
    pub fn new(name: &str, year: i32) -> Self {
        let mut competitor = Competitor {
            id: Uuid::new_v4(),
            name: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            years_active: BTreeSet::from([year]),
            wins: Vec::new(),
            podiums: Vec::new(),
            mains: Vec::new(),
            number_of_wins: 0,
            number_of_podiums: 0,
            number_of_mains: None,
            seasons_active: None,
            win_percentage: Ratio::NotANumber,
            podium_percentage: Ratio::NotANumber,
        };
        competitor.set_name(name);
        competitor
    }

    /// Sets the display name and re-derives first/last name from it
    pub fn set_name(&mut self, name: &str) {
        let tokens: Vec<&str> = name.split_whitespace().collect();
        self.name = tokens.join(" ");
        self.first_name = tokens.first().map(|t| t.to_string()).unwrap_or_default();
        self.last_name = tokens.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    }

    pub fn record(&mut self, entry: ResultEntry) {
        match entry {
            ResultEntry::Win(event) => self.wins.push(WinResult { event }),
            ResultEntry::Podium(placement) => self.podiums.push(placement),
            ResultEntry::Main(placement) => self.mains.push(placement),
        }
    }

    /// Every year referenced by any result, across wins, podiums and mains
    pub fn result_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.wins
            .iter()
            .map(|w| w.event.year)
            .chain(self.podiums.iter().map(|p| p.event.year))
            .chain(self.mains.iter().map(|m| m.event.year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 4, Ratio::Value(25.0))]
    #[case(1, 3, Ratio::Value(33.33))]
    #[case(2, 3, Ratio::Value(66.67))]
    #[case(0, 0, Ratio::NotANumber)]
    #[case(3, 0, Ratio::NotANumber)]
    fn percentage_rounds_or_goes_non_numeric(#[case] part: u32, #[case] whole: u32, #[case] expected: Ratio) {
        assert_eq!(Ratio::percentage(part, whole), expected);
    }

    #[test]
    fn ratio_serializes_nan_as_string() {
        assert_eq!(serde_json::to_string(&Ratio::NotANumber).unwrap(), "\"NaN\"");
        assert_eq!(serde_json::to_string(&Ratio::Value(12.5)).unwrap(), "12.5");
    }

    #[test]
    fn new_competitor_splits_name_and_records_creation_year() {
        let c = Competitor::new("  Mary  Van Der Berg ", 2018);
        assert_eq!(c.name, "Mary Van Der Berg");
        assert_eq!(c.first_name, "Mary");
        assert_eq!(c.last_name, "Van Der Berg");
        assert!(c.years_active.contains(&2018));
    }

    #[test]
    fn seed_record_keeps_preset_mains_and_drops_derived_fields() {
        let json = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "name": "Jane Doe",
            "numberOfWins": 99,
            "numberOfMains": 10,
            "wins": [{"event": {"name": "Nationals", "year": 2015}}]
        }"#;
        let c: Competitor = serde_json::from_str(json).unwrap();
        assert_eq!(c.id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(c.number_of_mains, Some(10));
        assert_eq!(c.number_of_wins, 0);
        assert_eq!(c.wins.len(), 1);
        assert_eq!(c.wins[0].event.day, None);
    }

    #[test]
    fn output_uses_camel_case_fields() {
        let c = Competitor::new("Jane Doe", 2019);
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["firstName"], "Jane");
        assert_eq!(value["yearsActive"], serde_json::json!([2019]));
        assert_eq!(value["winPercentage"], "NaN");
        assert!(value["seasonsActive"].is_null());
    }
}
