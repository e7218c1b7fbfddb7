//! Tabela szczegółów regionu i dokument do eksportu.
//!
//! Tabela interaktywna i PDF budują wiersze tą samą funkcją (`ReportRow::from`),
//! więc nie mogą się rozjechać.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::controller::Selection;
use crate::data::{JurisdictionIdentity, SourceCategory, SpeciesRegulationRow};
use crate::filters::FilterState;

pub const COLUMNS: [&str; 4] = ["Scientific Name", "Common Name", "Family", "Source"];
pub const PAGE_LENGTH: usize = 10;
pub const DATA_SOURCE: &str = "Regulated Plants Database";

/// Wiersz gotowy do wyświetlenia
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub scientific_name: String,
    pub common_name: String,
    pub family: String,
    pub source: SourceCategory,
}

impl From<&SpeciesRegulationRow> for ReportRow {
    fn from(row: &SpeciesRegulationRow) -> Self {
        Self {
            scientific_name: row.display_canonical_name().to_string(),
            common_name: row.display_common_name(),
            family: row.display_family_name().to_string(),
            source: row.category(),
        }
    }
}

impl ReportRow {
    pub fn cells(&self) -> [&str; 4] {
        [&self.scientific_name, &self.common_name, &self.family, self.source.label()]
    }
}

pub fn report_rows(rows: &[SpeciesRegulationRow]) -> Vec<ReportRow> {
    rows.iter().map(ReportRow::from).collect()
}

/// Etykieta miejsca: bez filtra regionalnego listy dotyczą całego kraju
pub fn location_label(identity: &JurisdictionIdentity, filters: &FilterState) -> String {
    if filters.region {
        identity.display_label()
    } else {
        identity.country_label().to_string()
    }
}

pub fn report_title(identity: &JurisdictionIdentity, filters: &FilterState) -> String {
    format!("Regulated Plants in {}", location_label(identity, filters))
}

/// Interaktywna tabela: sortowanie po kolumnie i stronicowanie
#[derive(Clone, Debug, PartialEq)]
pub struct ReportTable {
    rows: Vec<ReportRow>,
    sort_column: usize,
    ascending: bool,
    page: usize,
    /// wiersz pod kursorem na bieżącej stronie
    cursor: usize,
}

impl ReportTable {
    pub fn new(rows: Vec<ReportRow>) -> Self {
        let mut table = Self { rows, sort_column: 0, ascending: true, page: 0, cursor: 0 };
        table.sort();
        table
    }

    pub fn from_selection(selection: &Selection) -> Self {
        Self::new(report_rows(&selection.rows))
    }

    fn sort(&mut self) {
        let column = self.sort_column;
        let ascending = self.ascending;
        self.rows.sort_by(|a, b| {
            let ord = compare_cells(a.cells()[column], b.cells()[column]);
            if ascending { ord } else { ord.reverse() }
        });
    }

    /// Ta sama kolumna odwraca kierunek, inna sortuje rosnąco
    pub fn sort_by(&mut self, column: usize) {
        if column >= COLUMNS.len() {
            return;
        }
        if column == self.sort_column {
            self.ascending = !self.ascending;
        } else {
            self.sort_column = column;
            self.ascending = true;
        }
        self.page = 0;
        self.cursor = 0;
        self.sort();
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(PAGE_LENGTH).max(1)
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            self.cursor = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.cursor = 0;
        }
    }

    pub fn move_cursor(&mut self, down: bool) {
        let len = self.visible_rows().len();
        if down && self.cursor + 1 < len {
            self.cursor += 1;
        } else if !down && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_row(&self) -> Option<&ReportRow> {
        self.visible_rows().get(self.cursor)
    }

    pub fn visible_rows(&self) -> &[ReportRow] {
        let start = (self.page * PAGE_LENGTH).min(self.rows.len());
        let end = (start + PAGE_LENGTH).min(self.rows.len());
        &self.rows[start..end]
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn sort_state(&self) -> (usize, bool) {
        (self.sort_column, self.ascending)
    }

    /// "Showing 11 to 20 of 42 entries"
    pub fn page_info(&self) -> String {
        if self.rows.is_empty() {
            return "Showing 0 to 0 of 0 entries".to_string();
        }
        let start = self.page * PAGE_LENGTH + 1;
        let end = (start + PAGE_LENGTH - 1).min(self.rows.len());
        format!("Showing {start} to {end} of {} entries", self.rows.len())
    }
}

fn compare_cells(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Model dokumentu do eksportu, niezależny od formatu pliku
#[derive(Clone, Debug, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub subtitle: String,
    pub header: [&'static str; 4],
    pub rows: Vec<ReportRow>,
    pub footer: String,
    pub filename: String,
}

impl ReportDocument {
    /// Wiersze w kolejności tabeli (domyślne sortowanie po nazwie łacińskiej)
    pub fn build(selection: &Selection, date: NaiveDate) -> Self {
        let table = ReportTable::from_selection(selection);
        Self {
            title: report_title(&selection.identity, &selection.filters),
            subtitle: selection.filters.describe_scope(),
            header: COLUMNS,
            rows: table.rows().to_vec(),
            footer: footer_line(date),
            filename: export_filename(&selection.identity, &selection.filters, date),
        }
    }
}

/// Komunikat pustej tabeli; kraj bez żadnych danych to co innego niż puste filtry
pub fn empty_message(selection: &Selection) -> Option<String> {
    if !selection.rows.is_empty() {
        return None;
    }
    Some(if selection.has_any_data {
        "No species match the selected regulation levels.".to_string()
    } else {
        format!("No regulations recorded for {}.", selection.identity.country_label())
    })
}

pub fn footer_line(date: NaiveDate) -> String {
    format!("Provided by {DATA_SOURCE}, data is correct as of {}", date.format("%B %-d, %Y"))
}

/// `Regulated_Plants_<miejsce>_<RRRR-MM-DD>.pdf`, znaki spoza [A-Za-z0-9] → `_`
pub fn export_filename(identity: &JurisdictionIdentity, filters: &FilterState, date: NaiveDate) -> String {
    let base = if filters.region { identity.region.as_str() } else { identity.country_label() };
    let base: String = base.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    format!("Regulated_Plants_{base}_{}.pdf", date.format("%Y-%m-%d"))
}
