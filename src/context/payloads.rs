// Structured stat payloads posted by the dashboard
//
// Shapes mirror the dashboard's stats endpoints. Every field is optional at
// the serde level so that an absent or null value surfaces as a named
// MissingData error from the builder instead of a generic parse failure.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// An opaque scalar, interpolated into the narrative as-is
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Text(s) => f.write_str(s.trim()),
            StatValue::Number(n) => write!(f, "{n}"),
            StatValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for StatValue {
    fn from(s: &str) -> Self {
        StatValue::Text(s.to_string())
    }
}

impl From<i64> for StatValue {
    fn from(n: i64) -> Self {
        StatValue::Number(n.into())
    }
}

impl From<f64> for StatValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(StatValue::Number)
            .unwrap_or_else(|| StatValue::Text(n.to_string()))
    }
}

/// All payloads feeding one context build
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatPayloads {
    pub player: Option<PlayerBio>,
    pub performance: Option<PerformanceMetrics>,
    pub recent_event: Option<RecentEvent>,
    pub top_three: Option<TopThree>,
    pub glossary: Option<StatGlossary>,
}

/// Career profile of the player being viewed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerBio {
    pub full_name: Option<StatValue>,
    pub pdga_number: Option<StatValue>,
    pub division: Option<StatValue>,
    pub hometown: Option<StatValue>,
    pub nationality: Option<StatValue>,
    pub member_since: Option<StatValue>,
    pub wins: Option<StatValue>,
    pub top_tens: Option<StatValue>,
    pub podiums: Option<StatValue>,
    pub earnings: Option<StatValue>,
    pub avg_rating: Option<StatValue>,
    pub total_events: Option<StatValue>,
    pub avg_place: Option<StatValue>,
    pub avg_strokes_per_event: Option<StatValue>,
}

/// Percentile metrics in fixed order: FWH, C2R, C1X
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub values: Vec<Option<StatValue>>,
}

/// Summary of the player's most recent event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecentEvent {
    pub event_name: Option<StatValue>,
    pub event_location: Option<StatValue>,
    pub event_start_date: Option<StatValue>,
    pub event_rating: Option<StatValue>,
    pub event_score: Option<StatValue>,
    pub place: Option<StatValue>,
}

/// One of the player's best-ranked stats
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RankedMetric {
    pub stat_name: Option<StatValue>,
    pub player_average_value: Option<StatValue>,
    pub rank_in_division: Option<StatValue>,
}

/// Top ranked metrics, either as a list or keyed by rank ("1", "2", "3")
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TopThree {
    List(Vec<RankedMetric>),
    ByRank(BTreeMap<String, RankedMetric>),
}

impl TopThree {
    /// Metrics in rank order
    pub fn ordered(&self) -> Vec<&RankedMetric> {
        match self {
            TopThree::List(list) => list.iter().collect(),
            TopThree::ByRank(map) => {
                let mut entries: Vec<(&String, &RankedMetric)> = map.iter().collect();
                // numeric keys sort numerically, anything else after them by name
                entries.sort_by_key(|(k, _)| (k.parse::<u64>().unwrap_or(u64::MAX), (*k).clone()));
                entries.into_iter().map(|(_, m)| m).collect()
            }
        }
    }
}

/// Stat abbreviation glossary as parallel arrays
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatGlossary {
    pub name: Vec<Option<StatValue>>,
    #[serde(rename = "fullName", alias = "full_name")]
    pub full_name: Vec<Option<StatValue>>,
    pub desc: Vec<Option<StatValue>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_value_display() {
        assert_eq!(StatValue::from("  Jane Doe ").to_string(), "Jane Doe");
        assert_eq!(StatValue::from(3).to_string(), "3");
        assert_eq!(StatValue::from(72.5).to_string(), "72.5");
        assert_eq!(StatValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_null_field_deserializes_as_missing() {
        let bio: PlayerBio =
            serde_json::from_str(r#"{"full_name": "Jane Doe", "wins": null}"#).unwrap();
        assert_eq!(bio.full_name, Some(StatValue::from("Jane Doe")));
        assert!(bio.wins.is_none());
        assert!(bio.division.is_none());
    }

    #[test]
    fn test_top_three_by_rank_is_ordered_numerically() {
        let top: TopThree = serde_json::from_str(
            r#"{
                "10": {"stat_name": "last"},
                "2": {"stat_name": "second"},
                "1": {"stat_name": "first"}
            }"#,
        )
        .unwrap();

        let names: Vec<String> = top
            .ordered()
            .iter()
            .map(|m| m.stat_name.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "last"]);
    }

    #[test]
    fn test_glossary_accepts_camel_case() {
        let glossary: StatGlossary = serde_json::from_str(
            r#"{"name": ["FWH"], "fullName": ["Fairway Hits"], "desc": ["Fairways hit"]}"#,
        )
        .unwrap();
        assert_eq!(glossary.full_name.len(), 1);
    }
}
