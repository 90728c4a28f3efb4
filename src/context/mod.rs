// Context builder
//
// Turns the dashboard's stat payloads into one persona-qualified narrative.
// Pure: no I/O, no clock, no randomness. Sections always appear in the same
// order (biography, performance, recent event, top three, glossary) so the
// same payloads always produce the same bytes.

mod payloads;

pub use payloads::{
    PerformanceMetrics, PlayerBio, RankedMetric, RecentEvent, StatGlossary, StatPayloads,
    StatValue, TopThree,
};

use std::fmt;
use std::sync::Arc;

use crate::config::PersonaPolicy;
use crate::error::{RelayError, Result};

/// Labels for the performance values, in payload order
const PERFORMANCE_LABELS: [&str; 3] = [
    "Fairway Hits (FWH)",
    "Circle 2 in Regulation (C2R)",
    "C1X Putting (C1X)",
];

/// Number of ranked metrics rendered
const TOP_METRICS: usize = 3;

/// Full system instruction for the backend: persona preamble + domain narrative.
///
/// Cheap to clone; sessions hand out snapshots of it on every turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext(Arc<str>);

impl ConversationContext {
    /// Persona preamble alone, used before any player data is known
    pub fn persona_only(persona: &PersonaPolicy) -> Self {
        Self(Arc::from(persona.preamble()))
    }

    /// Persona preamble followed by a narrative the client built itself
    pub fn from_narrative(persona: &PersonaPolicy, narrative: &str) -> Result<Self> {
        let narrative = narrative.trim();
        if narrative.is_empty() {
            return Err(RelayError::Validation(
                "context must not be empty".to_string(),
            ));
        }
        Ok(Self(Arc::from(format!(
            "{}\n\n{}",
            persona.preamble(),
            narrative
        ))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the context for `payloads` under `persona`.
///
/// Fails with [`RelayError::MissingData`] naming the first absent payload or
/// field, so nothing like "undefined" ever reaches the backend.
pub fn build(persona: &PersonaPolicy, payloads: &StatPayloads) -> Result<ConversationContext> {
    let player = payloads
        .player
        .as_ref()
        .ok_or_else(|| missing("player"))?;
    let performance = payloads
        .performance
        .as_ref()
        .ok_or_else(|| missing("performance"))?;
    let recent = payloads
        .recent_event
        .as_ref()
        .ok_or_else(|| missing("recent_event"))?;
    let top_three = payloads
        .top_three
        .as_ref()
        .ok_or_else(|| missing("top_three"))?;
    let glossary = payloads
        .glossary
        .as_ref()
        .ok_or_else(|| missing("glossary"))?;

    let name = req(&player.full_name, "player.full_name")?;

    let sections = [
        biography_section(player, name)?,
        performance_section(performance, name)?,
        recent_event_section(recent, name)?,
        top_three_section(top_three, name)?,
        glossary_section(glossary)?,
    ];

    let mut text = persona.preamble();
    for section in &sections {
        text.push_str("\n\n");
        text.push_str(section);
    }

    Ok(ConversationContext(Arc::from(text)))
}

fn missing(path: &str) -> RelayError {
    RelayError::MissingData(path.to_string())
}

fn req<'a>(value: &'a Option<StatValue>, path: &str) -> Result<&'a StatValue> {
    value.as_ref().ok_or_else(|| missing(path))
}

fn biography_section(p: &PlayerBio, name: &StatValue) -> Result<String> {
    Ok(format!(
        "Current disc golf player the user is examining is {name}. \
         The player's PDGA number is {pdga}.\n\
         In the 'Career Profile' section of the current webpage, {name} is in the \
         {division} division, they live in {hometown}, their nationality is '{nationality}'. \
         They have been a member of the PDGA since {since}. \
         They have {wins} wins, {top_tens} top tens, {podiums} podiums, \
         have ${earnings} in earnings, an average rating of {rating}, \
         attended {events} events, have an average place of {place} in all of their events, \
         and average {strokes} strokes per event.",
        pdga = req(&p.pdga_number, "player.pdga_number")?,
        division = req(&p.division, "player.division")?,
        hometown = req(&p.hometown, "player.hometown")?,
        nationality = req(&p.nationality, "player.nationality")?,
        since = req(&p.member_since, "player.member_since")?,
        wins = req(&p.wins, "player.wins")?,
        top_tens = req(&p.top_tens, "player.top_tens")?,
        podiums = req(&p.podiums, "player.podiums")?,
        earnings = req(&p.earnings, "player.earnings")?,
        rating = req(&p.avg_rating, "player.avg_rating")?,
        events = req(&p.total_events, "player.total_events")?,
        place = req(&p.avg_place, "player.avg_place")?,
        strokes = req(&p.avg_strokes_per_event, "player.avg_strokes_per_event")?,
    ))
}

fn performance_section(m: &PerformanceMetrics, name: &StatValue) -> Result<String> {
    let mut text = format!(
        "Located in the 'Performance' section of the webpage are {name}'s metrics for \
         Fairway Hits (FWH), Circle 2 in Regulation (C2R), and C1X Putting (C1X)."
    );
    for (i, label) in PERFORMANCE_LABELS.iter().enumerate() {
        let value = m
            .values
            .get(i)
            .and_then(Option::as_ref)
            .ok_or_else(|| missing(&format!("performance.values[{i}]")))?;
        text.push_str(&format!("\n  - Their value for {label} is {value}%"));
    }
    Ok(text)
}

fn recent_event_section(e: &RecentEvent, name: &StatValue) -> Result<String> {
    Ok(format!(
        "Located in the 'Most Recent Event' section of the webpage, {name}'s most recent event \
         is the '{event}'. The event is located in {location} and started on {start}. \
         {name}'s rating from the event is {rating}, and their score is {score}. \
         They placed '{place}' in the event.",
        event = req(&e.event_name, "recent_event.event_name")?,
        location = req(&e.event_location, "recent_event.event_location")?,
        start = req(&e.event_start_date, "recent_event.event_start_date")?,
        rating = req(&e.event_rating, "recent_event.event_rating")?,
        score = req(&e.event_score, "recent_event.event_score")?,
        place = req(&e.place, "recent_event.place")?,
    ))
}

fn top_three_section(top: &TopThree, name: &StatValue) -> Result<String> {
    let metrics = top.ordered();
    let mut text = format!(
        "Located in the 'Top 3 Metrics (last 12 months)' section of the webpage, \
         {name}'s overall top three career metrics are:"
    );
    for i in 0..TOP_METRICS {
        let metric = metrics
            .get(i)
            .ok_or_else(|| missing(&format!("top_three[{i}]")))?;
        text.push_str(&format!(
            "\n  - '{stat}' (with a value of {value}% and this stat ranking in '{rank}' place in their division).",
            stat = req(&metric.stat_name, &format!("top_three[{i}].stat_name"))?,
            value = req(
                &metric.player_average_value,
                &format!("top_three[{i}].player_average_value")
            )?,
            rank = req(
                &metric.rank_in_division,
                &format!("top_three[{i}].rank_in_division")
            )?,
        ));
    }
    Ok(text)
}

fn glossary_section(g: &StatGlossary) -> Result<String> {
    if g.name.is_empty() {
        return Err(missing("glossary.name"));
    }

    let mut text = "Here's some context about what each performance metric abbreviation means:"
        .to_string();
    for i in 0..g.name.len() {
        text.push_str(&format!(
            "\n  - \"{abbr}\" is \"{full}\" and it means \"{desc}\".",
            abbr = glossary_cell(&g.name, i, "name")?,
            full = glossary_cell(&g.full_name, i, "fullName")?,
            desc = glossary_cell(&g.desc, i, "desc")?,
        ));
    }
    Ok(text)
}

fn glossary_cell<'a>(column: &'a [Option<StatValue>], i: usize, label: &str) -> Result<&'a StatValue> {
    column
        .get(i)
        .and_then(Option::as_ref)
        .ok_or_else(|| missing(&format!("glossary.{label}[{i}]")))
}
