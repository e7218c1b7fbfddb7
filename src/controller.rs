//! Cykl życia interaktywnej mapy.
//!
//! Kontroler nie wykonuje żadnego I/O. Dostaje zdarzenia (`MapEvent`) i
//! odpowiada poleceniami (`Command`), które wykonuje `fetcher`; wyniki
//! wracają jako kolejne zdarzenia. Każde zapytanie o liczniki i o szczegóły
//! dostaje rosnący numer sekwencyjny, a wynik jest przyjmowany tylko wtedy,
//! gdy pochodzi z ostatnio wysłanego zapytania.

use crate::colors::{ChoroplethColorer, FeatureStyle};
use crate::data::{JurisdictionIdentity, RegionDetail, RegulationCount, RegulationCounts, SpeciesRegulationRow};
use crate::error::Result;
use crate::filters::{FilterFlag, FilterState};
use crate::map_draw::{GeographySource, MapView};

pub const SUSPENDED_GUIDANCE: &str = "Enable at least one regulation level (r/n/i) to explore the map";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapState {
    /// Brak geografii (przed startem albo po błędzie ładowania)
    Idle,
    Loading,
    Ready,
    RegionSelected,
    /// Wszystkie filtry wyłączone
    Suspended,
}

/// Polecenia do wykonania poza kontrolerem
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    FetchCounts { seq: u64, filters: FilterState },
    FetchGeography,
    FetchDetail { seq: u64, identity: JurisdictionIdentity, filters: FilterState },
}

#[derive(Debug)]
pub enum MapEvent {
    Mount,
    CountsLoaded { seq: u64, result: Result<Vec<RegulationCount>> },
    GeographyLoaded { result: Result<Vec<GeographySource>> },
    DetailLoaded { seq: u64, identity: JurisdictionIdentity, result: Result<RegionDetail> },
    Hover(Option<usize>),
    Click(usize),
    Toggle(FilterFlag),
    /// Prośba z innego widoku: zachowuje się jak kliknięcie w pasujący region
    HighlightRegion { name: String, scroll: bool },
}

/// Dymek nad najechanym regionem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tooltip {
    pub label: String,
    pub text: String,
}

/// Wiersze pokazywane w tabeli, razem z filtrami, przy których je pobrano
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub identity: JurisdictionIdentity,
    pub rows: Vec<SpeciesRegulationRow>,
    pub filters: FilterState,
    pub has_any_data: bool,
}

pub struct MapViewController {
    state: MapState,
    filters: FilterState,
    colorer: ChoroplethColorer,
    counts: RegulationCounts,
    layer: Option<MapView>,
    counts_seq: u64,
    detail_seq: u64,
    awaiting_counts: bool,
    hovered: Option<usize>,
    /// ostatnio kliknięty obiekt, zachowuje pogrubioną ramkę
    selected_feature: Option<usize>,
    selected_identity: Option<JurisdictionIdentity>,
    selection: Option<Selection>,
    map_error: Option<String>,
    detail_error: Option<String>,
    pending_scroll: bool,
    scroll_requested: bool,
}

impl MapViewController {
    pub fn new(colorer: ChoroplethColorer) -> Self {
        Self::with_filters(colorer, FilterState::default())
    }

    pub fn with_filters(colorer: ChoroplethColorer, filters: FilterState) -> Self {
        Self {
            state: MapState::Idle,
            filters,
            colorer,
            counts: RegulationCounts::default(),
            layer: None,
            counts_seq: 0,
            detail_seq: 0,
            awaiting_counts: false,
            hovered: None,
            selected_feature: None,
            selected_identity: None,
            selection: None,
            map_error: None,
            detail_error: None,
            pending_scroll: false,
            scroll_requested: false,
        }
    }

    pub fn handle(&mut self, event: MapEvent) -> Vec<Command> {
        match event {
            MapEvent::Mount => self.mount(),
            MapEvent::CountsLoaded { seq, result } => {
                self.counts_loaded(seq, result);
                Vec::new()
            }
            MapEvent::GeographyLoaded { result } => {
                self.geography_loaded(result);
                Vec::new()
            }
            MapEvent::DetailLoaded { seq, identity, result } => {
                self.detail_loaded(seq, identity, result);
                Vec::new()
            }
            MapEvent::Hover(index) => {
                self.hover(index);
                Vec::new()
            }
            MapEvent::Click(index) => self.click(index),
            MapEvent::Toggle(flag) => self.toggle(flag),
            MapEvent::HighlightRegion { name, scroll } => self.highlight(&name, scroll),
        }
    }

    fn mount(&mut self) -> Vec<Command> {
        if self.state != MapState::Idle {
            return Vec::new();
        }
        tracing::info!(filters = %self.filters.to_query_string(), "Loading map data");
        self.state = MapState::Loading;
        self.map_error = None;
        self.layer = None;

        let mut commands = Vec::new();
        if self.filters.is_suspended() {
            self.awaiting_counts = false;
        } else {
            commands.push(self.next_counts_request());
        }
        commands.push(Command::FetchGeography);
        commands
    }

    fn next_counts_request(&mut self) -> Command {
        self.counts_seq += 1;
        self.awaiting_counts = true;
        Command::FetchCounts { seq: self.counts_seq, filters: self.filters }
    }

    fn next_detail_request(&mut self, identity: JurisdictionIdentity) -> Command {
        self.detail_seq += 1;
        Command::FetchDetail { seq: self.detail_seq, identity, filters: self.filters }
    }

    fn counts_loaded(&mut self, seq: u64, result: Result<Vec<RegulationCount>>) {
        if seq != self.counts_seq || !self.awaiting_counts || self.state == MapState::Idle {
            tracing::debug!(seq, latest = self.counts_seq, "Dropping stale counts response");
            return;
        }
        self.awaiting_counts = false;

        match result {
            Ok(counts) => {
                tracing::info!(seq, jurisdictions = counts.len(), "Counts loaded");
                self.counts = counts.into_iter().collect();
                if self.state != MapState::Loading {
                    self.map_error = None;
                }
                self.finish_loading();
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load regulation counts");
                if self.state == MapState::Loading {
                    self.fail_loading();
                } else {
                    self.map_error = Some("Failed to refresh map colours".to_string());
                }
            }
        }
    }

    fn geography_loaded(&mut self, result: Result<Vec<GeographySource>>) {
        if self.state != MapState::Loading {
            tracing::debug!(state = ?self.state, "Ignoring geography outside of loading");
            return;
        }
        match result.and_then(MapView::from_sources) {
            Ok(view) => {
                tracing::info!(features = view.feature_count(), "Map layer built");
                self.layer = Some(view);
                self.finish_loading();
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load geography");
                self.fail_loading();
            }
        }
    }

    fn finish_loading(&mut self) {
        if self.state != MapState::Loading || self.awaiting_counts || self.layer.is_none() {
            return;
        }
        self.state = if self.filters.is_suspended() { MapState::Suspended } else { MapState::Ready };
        tracing::info!(state = ?self.state, "Map ready");
    }

    fn fail_loading(&mut self) {
        self.state = MapState::Idle;
        self.layer = None;
        self.awaiting_counts = false;
        self.counts_seq += 1;
        self.map_error = Some("Failed to load map data.".to_string());
    }

    fn detail_loaded(&mut self, seq: u64, identity: JurisdictionIdentity, result: Result<RegionDetail>) {
        let current = self.state == MapState::RegionSelected
            && seq == self.detail_seq
            && self.selected_identity.as_ref() == Some(&identity);
        if !current {
            tracing::debug!(seq, latest = self.detail_seq, region = %identity, "Dropping stale detail response");
            return;
        }

        match result {
            Ok(detail) => {
                tracing::info!(seq, region = %identity, rows = detail.weeds.len(), "Region details loaded");
                self.selection = Some(Selection {
                    identity,
                    rows: detail.weeds,
                    filters: self.filters,
                    has_any_data: detail.has_any_data,
                });
                self.detail_error = None;
                if self.pending_scroll {
                    self.pending_scroll = false;
                    self.scroll_requested = true;
                }
            }
            Err(err) => {
                tracing::error!(region = %identity, error = %err, "Failed to load region details");
                self.detail_error = Some(format!("Error loading data for {}", identity.display_label()));
            }
        }
    }

    fn is_interactive(&self) -> bool {
        matches!(self.state, MapState::Ready | MapState::RegionSelected)
    }

    fn hover(&mut self, index: Option<usize>) {
        self.hovered = match index {
            Some(i) if self.is_interactive() && self.layer.as_ref().is_some_and(|l| i < l.feature_count()) => Some(i),
            _ => None,
        };
    }

    fn click(&mut self, index: usize) -> Vec<Command> {
        if !self.is_interactive() {
            return Vec::new();
        }
        let Some(identity) = self.layer.as_ref().and_then(|l| l.identity(index)).cloned() else {
            return Vec::new();
        };

        tracing::info!(region = %identity, "Region selected");
        self.selected_feature = Some(index);
        self.detail_error = None;
        if self.selection.as_ref().is_some_and(|s| s.identity != identity) {
            self.selection = None;
        }
        self.selected_identity = Some(identity.clone());
        self.state = MapState::RegionSelected;
        vec![self.next_detail_request(identity)]
    }

    fn toggle(&mut self, flag: FilterFlag) -> Vec<Command> {
        self.filters.toggle(flag);
        tracing::info!(flag = %flag, enabled = self.filters.is_enabled(flag), "Filter toggled");

        if self.filters.is_suspended() {
            self.suspend();
            return Vec::new();
        }

        match self.state {
            MapState::Idle => Vec::new(),
            MapState::Loading => vec![self.next_counts_request()],
            MapState::Suspended => {
                self.state = MapState::Ready;
                vec![self.next_counts_request()]
            }
            MapState::Ready => vec![self.next_counts_request()],
            MapState::RegionSelected => {
                let mut commands = vec![self.next_counts_request()];
                if let Some(identity) = self.selected_identity.clone() {
                    self.detail_error = None;
                    commands.push(self.next_detail_request(identity));
                }
                commands
            }
        }
    }

    fn suspend(&mut self) {
        self.hovered = None;
        self.selected_feature = None;
        self.selected_identity = None;
        self.selection = None;
        self.detail_error = None;
        self.pending_scroll = false;
        // wszystko, co jeszcze leci, staje się nieaktualne
        self.counts_seq += 1;
        self.detail_seq += 1;
        self.awaiting_counts = false;

        match self.state {
            MapState::Ready | MapState::RegionSelected | MapState::Suspended => self.state = MapState::Suspended,
            MapState::Loading => self.finish_loading(),
            MapState::Idle => {}
        }
        tracing::info!("All regulation levels disabled, map suspended");
    }

    fn highlight(&mut self, name: &str, scroll: bool) -> Vec<Command> {
        if self.filters.is_suspended() {
            tracing::info!(region = name, "Highlight ignored while filters are suspended");
            return Vec::new();
        }
        let Some(index) = self.find_feature(name) else {
            tracing::info!(region = name, "No rendered region matches highlight request");
            return Vec::new();
        };
        if scroll {
            self.pending_scroll = true;
        }
        self.click(index)
    }

    /// Dopasowanie po nazwie regionu, potem po pełnej etykiecie; bez względu na wielkość liter
    pub fn find_feature(&self, name: &str) -> Option<usize> {
        let layer = self.layer.as_ref()?;
        let wanted = name.trim().to_lowercase();
        let count = layer.feature_count();
        (0..count)
            .find(|i| layer.identity(*i).is_some_and(|id| id.region.to_lowercase() == wanted))
            .or_else(|| {
                (0..count).find(|i| layer.identity(*i).is_some_and(|id| id.display_label().to_lowercase() == wanted))
            })
    }

    pub fn style_for(&self, index: usize) -> FeatureStyle {
        if self.state == MapState::Suspended || self.filters.is_suspended() {
            return self.colorer.suspended_style();
        }
        let Some(identity) = self.layer.as_ref().and_then(|l| l.identity(index)) else {
            return self.colorer.no_data_style();
        };
        let style = self.colorer.style_for(self.counts.count_for(identity), identity);
        if self.hovered == Some(index) || self.selected_feature == Some(index) {
            style.emphasized()
        } else {
            style
        }
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        if !self.is_interactive() {
            return None;
        }
        let identity = self.layer.as_ref()?.identity(self.hovered?)?;
        // bez poziomu regionalnego listy są ogólnokrajowe
        let label = if self.filters.region {
            identity.display_label()
        } else {
            identity.country_label().to_string()
        };
        Some(Tooltip { label, text: format!("Regulated Plants: {}", self.counts.count_for(identity)) })
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub fn filters(&self) -> FilterState {
        self.filters
    }

    pub fn layer(&self) -> Option<&MapView> {
        self.layer.as_ref()
    }

    pub fn count_for(&self, identity: &JurisdictionIdentity) -> u32 {
        self.counts.count_for(identity)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn selected_feature(&self) -> Option<usize> {
        self.selected_feature
    }

    pub fn selected_identity(&self) -> Option<&JurisdictionIdentity> {
        self.selected_identity.as_ref()
    }

    /// Tabela jest widoczna tylko dla bieżącego zaznaczenia
    pub fn selection(&self) -> Option<&Selection> {
        match self.state {
            MapState::RegionSelected => self.selection.as_ref(),
            _ => None,
        }
    }

    /// Czeka na szczegóły dla zaznaczonego regionu
    pub fn is_detail_pending(&self) -> bool {
        self.state == MapState::RegionSelected
            && self.detail_error.is_none()
            && self.selection.as_ref().is_none_or(|s| s.filters != self.filters)
    }

    pub fn map_error(&self) -> Option<&str> {
        self.map_error.as_deref()
    }

    pub fn detail_error(&self) -> Option<&str> {
        self.detail_error.as_deref()
    }

    pub fn guidance(&self) -> Option<&'static str> {
        self.filters.is_suspended().then_some(SUSPENDED_GUIDANCE)
    }

    /// Jednorazowa prośba o przewinięcie do tabeli
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::Palette;
    use crate::error::AtlasError;
    use serde_json::json;

    fn controller() -> MapViewController {
        MapViewController::new(ChoroplethColorer::new(&Palette::default()).unwrap())
    }

    fn geography() -> Vec<GeographySource> {
        let square = |name: &str, x0: f64| {
            json!({
                "type": "Feature",
                "properties": {"name": name},
                "geometry": {"type": "Polygon",
                    "coordinates": [[[x0, 0.0], [x0 + 5.0, 0.0], [x0 + 5.0, 5.0], [x0, 5.0], [x0, 0.0]]]}
            })
        };
        let text = json!({"type": "FeatureCollection", "features": [square("Ontario", 0.0), square("Quebec", 5.0)]})
            .to_string();
        let collection = geojson::FeatureCollection::try_from(text.parse::<geojson::GeoJson>().unwrap()).unwrap();
        vec![GeographySource { filename: "canada.geojson".into(), collection }]
    }

    fn ready() -> MapViewController {
        let mut c = controller();
        let commands = c.handle(MapEvent::Mount);
        assert_eq!(commands.len(), 2);
        c.handle(MapEvent::CountsLoaded {
            seq: 1,
            result: Ok(vec![RegulationCount { identity: JurisdictionIdentity::new("Canada", "Ontario"), count: 120 }]),
        });
        c.handle(MapEvent::GeographyLoaded { result: Ok(geography()) });
        assert_eq!(c.state(), MapState::Ready);
        c
    }

    #[test]
    fn mount_requests_counts_and_geography() {
        let mut c = controller();
        let commands = c.handle(MapEvent::Mount);
        assert_eq!(
            commands,
            vec![Command::FetchCounts { seq: 1, filters: FilterState::default() }, Command::FetchGeography]
        );
        assert_eq!(c.state(), MapState::Loading);
        // drugi Mount niczego nie zmienia
        assert!(c.handle(MapEvent::Mount).is_empty());
    }

    #[test]
    fn loading_waits_for_both_halves() {
        let mut c = controller();
        c.handle(MapEvent::Mount);
        c.handle(MapEvent::GeographyLoaded { result: Ok(geography()) });
        assert_eq!(c.state(), MapState::Loading);
        c.handle(MapEvent::CountsLoaded { seq: 1, result: Ok(vec![]) });
        assert_eq!(c.state(), MapState::Ready);
    }

    #[test]
    fn geography_failure_returns_to_idle_with_message() {
        let mut c = controller();
        c.handle(MapEvent::Mount);
        c.handle(MapEvent::GeographyLoaded { result: Err(AtlasError::Network("down".into())) });
        assert_eq!(c.state(), MapState::Idle);
        assert!(c.map_error().is_some());
        // ponowna próba jest możliwa
        assert_eq!(c.handle(MapEvent::Mount).len(), 2);
    }

    #[test]
    fn click_fetches_details_and_emphasizes_feature() {
        let mut c = ready();
        let commands = c.handle(MapEvent::Click(0));
        assert_eq!(
            commands,
            vec![Command::FetchDetail {
                seq: 1,
                identity: JurisdictionIdentity::new("Canada", "Ontario"),
                filters: FilterState::default()
            }]
        );
        assert_eq!(c.state(), MapState::RegionSelected);
        assert!(c.is_detail_pending());
        assert_eq!(c.style_for(0).weight, 2);
        assert_eq!(c.style_for(1).weight, 1);
    }

    #[test]
    fn detail_failure_keeps_map_interactive() {
        let mut c = ready();
        c.handle(MapEvent::Click(1));
        c.handle(MapEvent::DetailLoaded {
            seq: 1,
            identity: JurisdictionIdentity::new("Canada", "Quebec"),
            result: Err(AtlasError::Api { status: 500, message: "boom".into() }),
        });
        assert_eq!(c.detail_error(), Some("Error loading data for Quebec, Canada"));
        assert!(c.layer().is_some());
        assert_eq!(c.handle(MapEvent::Click(0)).len(), 1);
        assert_eq!(c.detail_error(), None);
    }

    #[test]
    fn hover_shows_tooltip_with_count() {
        let mut c = ready();
        c.handle(MapEvent::Hover(Some(0)));
        assert_eq!(
            c.tooltip(),
            Some(Tooltip { label: "Ontario, Canada".into(), text: "Regulated Plants: 120".into() })
        );
        c.handle(MapEvent::Hover(None));
        assert_eq!(c.tooltip(), None);
        assert_eq!(c.style_for(0).weight, 1);
    }

    #[test]
    fn stale_counts_are_ignored() {
        let mut c = ready();
        let first = c.handle(MapEvent::Toggle(FilterFlag::International));
        let second = c.handle(MapEvent::Toggle(FilterFlag::International));
        let (Command::FetchCounts { seq: s1, .. }, Command::FetchCounts { seq: s2, .. }) = (&first[0], &second[0]) else {
            panic!("expected counts requests");
        };
        let ontario = JurisdictionIdentity::new("Canada", "Ontario");
        c.handle(MapEvent::CountsLoaded { seq: *s2, result: Ok(vec![RegulationCount { identity: ontario.clone(), count: 7 }]) });
        c.handle(MapEvent::CountsLoaded { seq: *s1, result: Ok(vec![RegulationCount { identity: ontario.clone(), count: 99 }]) });
        assert_eq!(c.count_for(&ontario), 7);
    }

    #[test]
    fn highlight_without_match_is_a_no_op() {
        let mut c = ready();
        assert!(c.handle(MapEvent::HighlightRegion { name: "Atlantis".into(), scroll: true }).is_empty());
        assert_eq!(c.state(), MapState::Ready);
    }

    #[test]
    fn highlight_matches_case_insensitively_and_requests_scroll() {
        let mut c = ready();
        let commands = c.handle(MapEvent::HighlightRegion { name: "quebec".into(), scroll: true });
        assert_eq!(commands.len(), 1);
        assert_eq!(c.selected_feature(), Some(1));
        assert!(!c.take_scroll_request());
        c.handle(MapEvent::DetailLoaded {
            seq: 1,
            identity: JurisdictionIdentity::new("Canada", "Quebec"),
            result: Ok(RegionDetail { weeds: vec![], has_any_data: false }),
        });
        assert!(c.take_scroll_request());
        assert!(!c.take_scroll_request());
    }
}
