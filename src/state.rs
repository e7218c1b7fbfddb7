use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::path::PathBuf;

use crate::controller::{Command, MapEvent, MapState, MapViewController, Selection};
use crate::fetcher::AppMessage;
use crate::filters::FilterFlag;
use crate::pdf::{self, Branding};
use crate::report::{ReportDocument, ReportTable};
use crate::species::{SpeciesCommand, SpeciesSearch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Map,
    Table,
    Search,
}

pub struct AppState {
    pub controller: MapViewController,
    pub search: SpeciesSearch,
    pub table: Option<ReportTable>,
    pub active_panel: Panel,
    /// kursor na liście regionów (indeks w `regions`)
    pub selected: usize,
    /// indeksy obiektów mapy w kolejności listy
    pub regions: Vec<usize>,
    /// obszar mapy z ostatniej klatki, do obsługi myszy
    pub map_area: Rect,
    pub status: String,
    export_dir: PathBuf,
    branding: Branding,
    shown: Option<Selection>,
    commands: Vec<Command>,
    species_commands: Vec<SpeciesCommand>,
}

impl AppState {
    pub const HELP_TEXT: &'static str =
        "Tab: panel  ↑/↓: region  Enter: select/species  r/n/i: levels  ←/→: page  1-4: sort  p: PDF  R: retry  q: quit";

    pub fn new(controller: MapViewController, export_dir: PathBuf, branding: Branding) -> Self {
        Self {
            controller,
            search: SpeciesSearch::default(),
            table: None,
            active_panel: Panel::Map,
            selected: 0,
            regions: Vec::new(),
            map_area: Rect::default(),
            status: Self::HELP_TEXT.to_string(),
            export_dir,
            branding,
            shown: None,
            commands: Vec::new(),
            species_commands: Vec::new(),
        }
    }

    /// Polecenia czekające na wykonanie przez `Fetcher`
    pub fn take_commands(&mut self) -> (Vec<Command>, Vec<SpeciesCommand>) {
        (std::mem::take(&mut self.commands), std::mem::take(&mut self.species_commands))
    }

    pub fn dispatch(&mut self, event: MapEvent) {
        let commands = self.controller.handle(event);
        self.commands.extend(commands);
        self.sync();
    }

    pub fn apply(&mut self, message: AppMessage) {
        match message {
            AppMessage::Map(event) => self.dispatch(event),
            AppMessage::SearchLoaded { seq, result } => {
                let next = self.search.results_loaded(seq, result);
                self.species_commands.extend(next);
            }
            AppMessage::JurisdictionsLoaded { seq, result } => self.search.jurisdictions_loaded(seq, result),
        }
    }

    /// Lista regionów i tabela podążają za kontrolerem
    fn sync(&mut self) {
        match self.controller.layer() {
            Some(layer) if self.regions.is_empty() => {
                self.regions = layer.resolved_indices();
                self.selected = 0;
            }
            None => self.regions.clear(),
            _ => {}
        }

        let current = self.controller.selection().cloned();
        if current != self.shown {
            self.table = current.as_ref().map(ReportTable::from_selection);
            self.shown = current;
        }

        if self.controller.take_scroll_request() {
            self.active_panel = Panel::Table;
        }
    }

    /// Kursor listy regionów staje na zaznaczonym obiekcie mapy
    fn follow_selection(&mut self) {
        let Some(index) = self.controller.selected_feature() else {
            return;
        };
        if let Some(pos) = self.regions.iter().position(|i| *i == index) {
            self.selected = pos;
        }
    }

    fn cursor_feature(&self) -> Option<usize> {
        self.regions.get(self.selected).copied()
    }

    fn move_region_cursor(&mut self, down: bool) {
        if self.regions.is_empty() {
            return;
        }
        if down && self.selected + 1 < self.regions.len() {
            self.selected += 1;
        } else if !down && self.selected > 0 {
            self.selected -= 1;
        }
        self.dispatch(MapEvent::Hover(self.cursor_feature()));
    }

    /// Zwraca true, jeśli trzeba wyjść
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        if self.active_panel == Panel::Search {
            return self.handle_search_input(key);
        }
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Tab => self.next_panel(),
            Char('r') => self.dispatch(MapEvent::Toggle(FilterFlag::Region)),
            Char('n') => self.dispatch(MapEvent::Toggle(FilterFlag::National)),
            Char('i') => self.dispatch(MapEvent::Toggle(FilterFlag::International)),
            Char('R') => self.dispatch(MapEvent::Mount),
            Char('p') => self.export_pdf(),
            Char('/') => self.active_panel = Panel::Search,
            _ if self.active_panel == Panel::Map => self.handle_map_input(key),
            _ => self.handle_table_input(key),
        }
        false
    }

    fn next_panel(&mut self) {
        self.active_panel = match self.active_panel {
            Panel::Map => Panel::Table,
            Panel::Table => Panel::Search,
            Panel::Search => Panel::Map,
        };
    }

    fn handle_map_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up => self.move_region_cursor(false),
            KeyCode::Down => self.move_region_cursor(true),
            KeyCode::Enter => {
                if let Some(index) = self.cursor_feature() {
                    self.dispatch(MapEvent::Click(index));
                }
            }
            _ => {}
        }
    }

    fn handle_table_input(&mut self, key: KeyCode) {
        let Some(table) = self.table.as_mut() else {
            return;
        };
        match key {
            KeyCode::Left => table.prev_page(),
            KeyCode::Right => table.next_page(),
            KeyCode::Up => table.move_cursor(false),
            KeyCode::Down => table.move_cursor(true),
            KeyCode::Char(c @ '1'..='4') => table.sort_by(c as usize - '1' as usize),
            // gatunek z tabeli otwiera się w wyszukiwarce
            KeyCode::Enter => {
                if let Some(row) = table.current_row() {
                    let name = row.scientific_name.clone();
                    self.species_commands.extend(self.search.look_up(&name));
                    self.active_panel = Panel::Search;
                }
            }
            _ => {}
        }
    }

    fn handle_search_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Tab => self.next_panel(),
            KeyCode::Esc if self.search.chosen().is_some() => self.search.clear_choice(),
            KeyCode::Esc => self.active_panel = Panel::Map,
            KeyCode::Up => self.search.move_cursor(false),
            KeyCode::Down => self.search.move_cursor(true),
            KeyCode::Backspace => {
                if self.search.chosen().is_none() {
                    self.species_commands.extend(self.search.pop_char());
                }
            }
            KeyCode::Enter => {
                if self.search.chosen().is_none() {
                    self.species_commands.extend(self.search.choose());
                } else if let Some(name) = self.search.highlighted_region() {
                    self.dispatch(MapEvent::HighlightRegion { name, scroll: true });
                    self.follow_selection();
                }
            }
            KeyCode::Char(c) if self.search.chosen().is_none() => {
                self.species_commands.extend(self.search.push_char(c));
            }
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(layer) = self.controller.layer() else {
            return;
        };
        let feature = layer
            .coord_at(self.map_area, mouse.column, mouse.row)
            .and_then(|(x, y)| layer.feature_at(x, y));
        match mouse.kind {
            MouseEventKind::Moved => {
                if feature != self.controller.hovered() {
                    self.dispatch(MapEvent::Hover(feature));
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = feature {
                    self.dispatch(MapEvent::Click(index));
                    self.follow_selection();
                }
            }
            _ => {}
        }
    }

    fn export_pdf(&mut self) {
        let Some(selection) = self.controller.selection() else {
            self.status = "Select a region before exporting".to_string();
            return;
        };
        let today = chrono::Local::now().date_naive();
        let mut document = ReportDocument::build(selection, today);
        if let Some(table) = &self.table {
            // kolejność jak w tabeli na ekranie
            document.rows = table.rows().to_vec();
        }
        self.status = match pdf::export(&document, &self.branding, &self.export_dir) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(err) => {
                tracing::error!(error = %err, "PDF export failed");
                format!("Export failed: {err}")
            }
        };
    }

    pub fn is_loading(&self) -> bool {
        self.controller.state() == MapState::Loading
    }
}
