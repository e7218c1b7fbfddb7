//! Wyszukiwarka gatunków i lista jurysdykcji, które je regulują.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::data::{COMMON_NAME_SENTINEL, display_country_name};
use crate::error::Result;

/// Krótsze zapytania nie trafiają do API
pub const MIN_QUERY_LEN: usize = 2;

pub const NATIONAL_MARKER: &str = "National Level";
pub const INTERNATIONAL_MARKER: &str = "International Level";

/// Ile pozycji listy po przecinkach pokazujemy
const SHOWN_NAMES: usize = 3;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SpeciesMatch {
    #[serde(default)]
    pub common_name: Option<String>,
    pub canonical_name: String,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub synonyms: Option<String>,
    pub usage_key: i64,
}

fn first_names(list: &str) -> String {
    let parts: Vec<&str> = list.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    parts.iter().take(SHOWN_NAMES).copied().collect::<Vec<_>>().join(", ")
}

impl SpeciesMatch {
    pub fn common_name(&self) -> Option<&str> {
        self.common_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && !n.contains(COMMON_NAME_SENTINEL))
    }

    /// Tekst pozycji na liście wyników
    pub fn display_text(&self) -> String {
        match self.common_name() {
            Some(common) => format!("{common} ({})", self.canonical_name),
            None => format!("({})", self.canonical_name),
        }
    }

    /// Nagłówek szczegółów: najwyżej trzy nazwy zwyczajowe
    pub fn title(&self) -> String {
        match self.common_name() {
            Some(common) => first_names(common),
            None => format!("({})", self.canonical_name),
        }
    }

    pub fn family(&self) -> &str {
        self.family_name.as_deref().filter(|f| !f.trim().is_empty()).unwrap_or("Not available")
    }

    pub fn shown_synonyms(&self) -> Option<String> {
        self.synonyms.as_deref().filter(|s| !s.trim().is_empty()).map(first_names)
    }
}

/// Dokładne dopasowanie nazwy łacińskiej, inaczej pierwszy wynik
pub fn best_match<'a>(results: &'a [SpeciesMatch], name: &str) -> Option<&'a SpeciesMatch> {
    results
        .iter()
        .find(|m| m.canonical_name.eq_ignore_ascii_case(name.trim()))
        .or_else(|| results.first())
}

/// Regulacje gatunku w jednej grupie (kraj albo UE)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JurisdictionSummary {
    pub name: String,
    pub national: bool,
    pub international: bool,
    pub regions: Vec<String>,
}

impl JurisdictionSummary {
    pub fn regions_label(&self) -> Option<String> {
        match self.regions.len() {
            0 => None,
            1 => Some(format!("Region: {}", self.regions[0])),
            _ => Some(format!("Regions: {}", self.regions.join(", "))),
        }
    }
}

pub fn summarize(by_group: &BTreeMap<String, Vec<String>>) -> Vec<JurisdictionSummary> {
    by_group
        .iter()
        .map(|(group, names)| JurisdictionSummary {
            name: display_country_name(group).to_string(),
            national: names.iter().any(|n| n == NATIONAL_MARKER),
            international: names.iter().any(|n| n == INTERNATIONAL_MARKER),
            regions: names
                .iter()
                .filter(|n| *n != NATIONAL_MARKER && *n != INTERNATIONAL_MARKER)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Polecenia wyszukiwarki dla `fetcher`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeciesCommand {
    Search { seq: u64, term: String },
    Jurisdictions { seq: u64, usage_key: i64 },
}

/// Stan wyszukiwarki; jak w kontrolerze mapy liczy się tylko ostatnie zapytanie
#[derive(Debug, Default)]
pub struct SpeciesSearch {
    pub query: String,
    results: Vec<SpeciesMatch>,
    cursor: usize,
    search_seq: u64,
    detail_seq: u64,
    chosen: Option<SpeciesMatch>,
    jurisdictions: Option<Vec<JurisdictionSummary>>,
    region_cursor: usize,
    error: Option<String>,
    /// nazwa z tabeli regionu; wynik wybieramy sami, gdy przyjdzie
    pick: Option<String>,
}

impl SpeciesSearch {
    pub fn push_char(&mut self, c: char) -> Option<SpeciesCommand> {
        self.pick = None;
        self.query.push(c);
        self.search()
    }

    pub fn pop_char(&mut self) -> Option<SpeciesCommand> {
        self.pick = None;
        self.query.pop();
        self.search()
    }

    /// Szukanie po nazwie łacińskiej z tabeli; po wynikach od razu wybiera gatunek
    pub fn look_up(&mut self, canonical_name: &str) -> Option<SpeciesCommand> {
        self.clear_choice();
        self.error = None;
        self.query = canonical_name.trim().to_string();
        let command = self.search();
        self.pick = command.as_ref().map(|_| self.query.clone());
        command
    }

    fn search(&mut self) -> Option<SpeciesCommand> {
        self.search_seq += 1;
        self.cursor = 0;
        let term = self.query.trim();
        if term.chars().count() < MIN_QUERY_LEN {
            self.results.clear();
            return None;
        }
        Some(SpeciesCommand::Search { seq: self.search_seq, term: term.to_string() })
    }

    pub fn results_loaded(&mut self, seq: u64, result: Result<Vec<SpeciesMatch>>) -> Option<SpeciesCommand> {
        if seq != self.search_seq {
            tracing::debug!(seq, latest = self.search_seq, "Dropping stale search results");
            return None;
        }
        match result {
            Ok(results) => {
                self.results = results;
                self.error = None;
            }
            Err(err) => {
                tracing::error!(error = %err, "Species search failed");
                self.results.clear();
                self.error = Some("Search failed. Please try again.".to_string());
            }
        }
        self.cursor = 0;

        let name = self.pick.take()?;
        let found = best_match(&self.results, &name)?;
        self.cursor = self.results.iter().position(|m| std::ptr::eq(m, found)).unwrap_or(0);
        self.choose()
    }

    pub fn move_cursor(&mut self, down: bool) {
        if self.chosen.is_some() {
            let len = self.summary_region_count();
            step(&mut self.region_cursor, len, down);
        } else {
            step(&mut self.cursor, self.results.len(), down);
        }
    }

    /// Wybór gatunku z listy wyników
    pub fn choose(&mut self) -> Option<SpeciesCommand> {
        let chosen = self.results.get(self.cursor)?.clone();
        self.detail_seq += 1;
        self.jurisdictions = None;
        self.region_cursor = 0;
        self.error = None;
        let usage_key = chosen.usage_key;
        self.chosen = Some(chosen);
        Some(SpeciesCommand::Jurisdictions { seq: self.detail_seq, usage_key })
    }

    pub fn jurisdictions_loaded(&mut self, seq: u64, result: Result<BTreeMap<String, Vec<String>>>) {
        if seq != self.detail_seq || self.chosen.is_none() {
            tracing::debug!(seq, latest = self.detail_seq, "Dropping stale jurisdiction lookup");
            return;
        }
        match result {
            Ok(by_group) => self.jurisdictions = Some(summarize(&by_group)),
            Err(err) => {
                tracing::error!(error = %err, "Jurisdiction lookup failed");
                self.error = Some("Error loading data. Please try again.".to_string());
            }
        }
    }

    /// Powrót do listy wyników
    pub fn clear_choice(&mut self) {
        self.chosen = None;
        self.jurisdictions = None;
        self.detail_seq += 1;
    }

    fn region_entries(&self) -> Vec<String> {
        self.jurisdictions
            .iter()
            .flatten()
            .flat_map(|j| j.regions.iter().cloned())
            .collect()
    }

    fn summary_region_count(&self) -> usize {
        self.region_entries().len()
    }

    /// Region pod kursorem, do podświetlenia na mapie
    pub fn highlighted_region(&self) -> Option<String> {
        self.region_entries().into_iter().nth(self.region_cursor)
    }

    pub fn results(&self) -> &[SpeciesMatch] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn region_cursor(&self) -> usize {
        self.region_cursor
    }

    pub fn chosen(&self) -> Option<&SpeciesMatch> {
        self.chosen.as_ref()
    }

    pub fn jurisdictions(&self) -> Option<&[JurisdictionSummary]> {
        self.jurisdictions.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn step(cursor: &mut usize, len: usize, down: bool) {
    if down {
        if *cursor + 1 < len {
            *cursor += 1;
        }
    } else if *cursor > 0 {
        *cursor -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtlasError;

    fn lantana() -> SpeciesMatch {
        SpeciesMatch {
            common_name: Some("lantana, common lantana, wild sage, shrub verbena".into()),
            canonical_name: "Lantana camara".into(),
            family_name: Some("Verbenaceae".into()),
            synonyms: Some("Camara vulgaris, Lantana aculeata, Lantana armata, Lantana scabrida".into()),
            usage_key: 2925303,
        }
    }

    #[test]
    fn display_text_handles_sentinel() {
        let mut m = lantana();
        assert_eq!(m.display_text(), "lantana, common lantana, wild sage, shrub verbena (Lantana camara)");
        m.common_name = Some(COMMON_NAME_SENTINEL.into());
        assert_eq!(m.display_text(), "(Lantana camara)");
        assert_eq!(m.title(), "(Lantana camara)");
    }

    #[test]
    fn long_lists_are_truncated_to_three() {
        let m = lantana();
        assert_eq!(m.title(), "lantana, common lantana, wild sage");
        assert_eq!(m.shown_synonyms().as_deref(), Some("Camara vulgaris, Lantana aculeata, Lantana armata"));
    }

    #[test]
    fn exact_canonical_match_wins() {
        let mut other = lantana();
        other.canonical_name = "Lantana montevidensis".into();
        let results = vec![other, lantana()];
        assert_eq!(best_match(&results, "lantana camara").unwrap().canonical_name, "Lantana camara");
        assert_eq!(best_match(&results, "Lantana").unwrap().canonical_name, "Lantana montevidensis");
        assert!(best_match(&[], "x").is_none());
    }

    #[test]
    fn summary_splits_markers_from_regions() {
        let mut by_group = BTreeMap::new();
        by_group.insert("United States".to_string(), vec![NATIONAL_MARKER.into(), "California".into(), "Texas".into()]);
        by_group.insert("EU".to_string(), vec![INTERNATIONAL_MARKER.into()]);
        let summary = summarize(&by_group);
        assert_eq!(summary[0].name, "European Union");
        assert!(summary[0].international && summary[0].regions.is_empty());
        assert_eq!(summary[1].regions_label().as_deref(), Some("Regions: California, Texas"));
        assert!(summary[1].national);
    }

    #[test]
    fn short_queries_do_not_search() {
        let mut search = SpeciesSearch::default();
        assert_eq!(search.push_char('l'), None);
        assert_eq!(search.push_char('a'), Some(SpeciesCommand::Search { seq: 2, term: "la".into() }));
    }

    #[test]
    fn only_latest_search_is_applied() {
        let mut search = SpeciesSearch::default();
        search.push_char('l');
        search.push_char('a');
        search.push_char('n');
        search.results_loaded(3, Ok(vec![lantana()]));
        search.results_loaded(2, Ok(vec![]));
        assert_eq!(search.results().len(), 1);

        search.results_loaded(3, Err(AtlasError::Network("offline".into())));
        assert!(search.results().is_empty());
        assert!(search.error().is_some());
    }

    #[test]
    fn lookup_from_table_picks_exact_name() {
        let mut search = SpeciesSearch::default();
        let Some(SpeciesCommand::Search { seq, term }) = search.look_up(" Lantana camara ") else {
            panic!("expected search");
        };
        assert_eq!(term, "Lantana camara");

        let mut other = lantana();
        other.canonical_name = "Lantana montevidensis".into();
        other.usage_key = 7;
        let next = search.results_loaded(seq, Ok(vec![other, lantana()]));
        assert!(matches!(next, Some(SpeciesCommand::Jurisdictions { usage_key: 2925303, .. })));
        assert_eq!(search.chosen().map(|m| m.canonical_name.as_str()), Some("Lantana camara"));
        assert_eq!(search.cursor(), 1);
    }

    #[test]
    fn typed_search_does_not_pick() {
        let mut search = SpeciesSearch::default();
        search.look_up("Lantana camara");
        search.push_char('x');
        assert_eq!(search.results_loaded(2, Ok(vec![lantana()])), None);
        assert!(search.chosen().is_none());
    }

    #[test]
    fn choosing_a_species_walks_its_regions() {
        let mut search = SpeciesSearch::default();
        search.push_char('l');
        search.push_char('a');
        search.results_loaded(2, Ok(vec![lantana()]));
        let Some(SpeciesCommand::Jurisdictions { seq, usage_key }) = search.choose() else {
            panic!("expected lookup");
        };
        assert_eq!(usage_key, 2925303);

        let mut by_group = BTreeMap::new();
        by_group.insert("Australia".to_string(), vec!["Queensland".into(), "Victoria".into()]);
        search.jurisdictions_loaded(seq, Ok(by_group));
        assert_eq!(search.highlighted_region().as_deref(), Some("Queensland"));
        search.move_cursor(true);
        assert_eq!(search.highlighted_region().as_deref(), Some("Victoria"));
        search.move_cursor(true);
        assert_eq!(search.highlighted_region().as_deref(), Some("Victoria"));
    }
}
