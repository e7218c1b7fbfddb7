use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::controller::MapState;
use crate::filters::FilterFlag;
use crate::report::{self, COLUMNS};
use crate::state::{AppState, Panel};

fn panel_block(title: impl Into<String>, active: bool) -> Block<'static> {
    let style = if active { Style::default().fg(Color::Yellow) } else { Style::default() };
    Block::default().borders(Borders::ALL).border_style(style).title(title.into())
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20), Constraint::Percentage(45), Constraint::Percentage(35)])
        .split(outer[0]);

    draw_region_list(f, state, chunks[0]);
    draw_map(f, state, chunks[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    draw_details(f, state, right[0]);
    draw_search(f, state, right[1]);

    let status = Paragraph::new(state.status.as_str()).style(Style::default().fg(Color::DarkGray));
    f.render_widget(status, outer[1]);
}

// Lewy panel: regiony z licznikami
fn draw_region_list(f: &mut Frame, state: &AppState, area: Rect) {
    let controller = &state.controller;
    let items: Vec<ListItem> = match controller.layer() {
        Some(layer) => state
            .regions
            .iter()
            .filter_map(|i| layer.identity(*i))
            .map(|id| ListItem::new(format!("{} ({})", id.display_label(), controller.count_for(id))))
            .collect(),
        None => Vec::new(),
    };
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(state.selected));
    }
    let list = List::new(items)
        .block(panel_block("Regions", state.active_panel == Panel::Map))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, area, &mut list_state);
}

// Środek: mapa i pasek filtrów
fn draw_map(f: &mut Frame, state: &mut AppState, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);
    state.map_area = parts[0];

    let controller = &state.controller;
    match controller.layer() {
        Some(layer) => {
            let title = match (controller.tooltip(), controller.map_error()) {
                (Some(tip), _) => format!("{}: {}", tip.label, tip.text),
                (None, Some(err)) => err.to_string(),
                (None, None) => "Map".to_string(),
            };
            layer.render(f, parts[0], &title, |i| controller.style_for(i));
        }
        None => {
            let text = match (controller.state(), controller.map_error()) {
                (MapState::Loading, _) => "Loading map data...".to_string(),
                (_, Some(err)) => format!("{err}\nPress R to retry."),
                _ => "Map not loaded. Press R to load.".to_string(),
            };
            let placeholder = Paragraph::new(text).block(panel_block("Map", false)).wrap(Wrap { trim: true });
            f.render_widget(placeholder, parts[0]);
        }
    }

    let filters = controller.filters();
    let mut spans: Vec<Span> = FilterFlag::ALL
        .iter()
        .map(|flag| {
            let (mark, style) = if filters.is_enabled(*flag) {
                ("[x]", Style::default().fg(Color::Green))
            } else {
                ("[ ]", Style::default().fg(Color::DarkGray))
            };
            Span::styled(format!("{mark} {}  ", flag.label()), style)
        })
        .collect();
    if let Some(guidance) = controller.guidance() {
        spans.push(Span::styled(guidance, Style::default().fg(Color::Yellow)));
    }
    let bar = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Regulation levels"))
        .wrap(Wrap { trim: true });
    f.render_widget(bar, parts[1]);
}

// Prawy panel: tabela wybranego regionu
fn draw_details(f: &mut Frame, state: &AppState, area: Rect) {
    let controller = &state.controller;
    let block = panel_block("Details", state.active_panel == Panel::Table);

    if let Some(guidance) = controller.guidance() {
        f.render_widget(Paragraph::new(guidance).block(block).wrap(Wrap { trim: true }), area);
        return;
    }
    let Some(identity) = controller.selected_identity().filter(|_| controller.state() == MapState::RegionSelected)
    else {
        let hint = "Select a region on the map to see its regulated plants.";
        f.render_widget(Paragraph::new(hint).block(block).wrap(Wrap { trim: true }), area);
        return;
    };

    // tytuł opisuje pokazane wiersze, nie filtry jeszcze wczytywanego zapytania
    let filters = controller.selection().map_or(controller.filters(), |s| s.filters);
    let mut header = vec![
        Line::styled(report::report_title(identity, &filters), Style::default().add_modifier(Modifier::BOLD)),
        Line::styled(filters.describe_scope(), Style::default().add_modifier(Modifier::ITALIC)),
    ];
    if let Some(err) = controller.detail_error() {
        header.push(Line::styled(err.to_string(), Style::default().fg(Color::Red)));
    } else if controller.is_detail_pending() {
        header.push(Line::styled(
            format!("Loading data for {}...", identity.display_label()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let inner = block.inner(area);
    f.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(header.len() as u16), Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    f.render_widget(Paragraph::new(header), parts[0]);

    let (Some(selection), Some(table)) = (controller.selection(), state.table.as_ref()) else {
        return;
    };
    if let Some(message) = report::empty_message(selection) {
        f.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), parts[1]);
        return;
    }

    let (sort_column, ascending) = table.sort_state();
    let header_row = Row::new(COLUMNS.iter().enumerate().map(|(i, name)| {
        let label = match (i == sort_column, ascending) {
            (true, true) => format!("{name} ▲"),
            (true, false) => format!("{name} ▼"),
            _ => name.to_string(),
        };
        Cell::from(label)
    }))
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = table
        .visible_rows()
        .iter()
        .map(|r| Row::new(r.cells().map(|c| Cell::from(c.to_string()))));
    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(30),
        Constraint::Percentage(22),
        Constraint::Percentage(18),
    ];
    let mut table_state = TableState::default();
    if state.active_panel == Panel::Table {
        table_state.select(Some(table.cursor()));
    }
    let widget = Table::new(rows, widths)
        .header(header_row)
        .highlight_symbol(">> ")
        .row_highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(widget, parts[1], &mut table_state);
    f.render_widget(Paragraph::new(table.page_info()).style(Style::default().fg(Color::DarkGray)), parts[2]);
}

// Prawy dolny panel: wyszukiwarka gatunków
fn draw_search(f: &mut Frame, state: &AppState, area: Rect) {
    let search = &state.search;
    let block = panel_block(format!("Species search: {}", search.query), state.active_panel == Panel::Search);

    if let Some(species) = search.chosen() {
        let mut lines = vec![
            Line::styled(species.title(), Style::default().add_modifier(Modifier::BOLD)),
            Line::styled(species.canonical_name.clone(), Style::default().add_modifier(Modifier::ITALIC)),
            Line::from(format!("Family: {}", species.family())),
        ];
        if let Some(synonyms) = species.shown_synonyms() {
            lines.push(Line::from(format!("Synonyms: {synonyms}")));
        }
        if let Some(err) = search.error() {
            lines.push(Line::styled(err.to_string(), Style::default().fg(Color::Red)));
        }
        let highlighted = search.highlighted_region();
        match search.jurisdictions() {
            None if search.error().is_none() => lines.push(Line::from("Loading regulations...")),
            None => {}
            Some([]) => lines.push(Line::from("No regulations found for this species.")),
            Some(summaries) => {
                for summary in summaries {
                    let mut levels = Vec::new();
                    if summary.national {
                        levels.push("National");
                    }
                    if summary.international {
                        levels.push("International");
                    }
                    let suffix = if levels.is_empty() { String::new() } else { format!(" ({})", levels.join(", ")) };
                    lines.push(Line::styled(format!("{}{suffix}", summary.name), Style::default().fg(Color::Cyan)));
                    for region in &summary.regions {
                        let style = if highlighted.as_deref() == Some(region.as_str()) {
                            Style::default().fg(Color::Red)
                        } else {
                            Style::default()
                        };
                        lines.push(Line::styled(format!("  {region}"), style));
                    }
                }
            }
        }
        f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
        return;
    }

    if let Some(err) = search.error() {
        f.render_widget(Paragraph::new(err.to_string()).block(block), area);
        return;
    }
    let items: Vec<ListItem> = search.results().iter().map(|m| ListItem::new(m.display_text())).collect();
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(search.cursor()));
    }
    let list = List::new(items)
        .block(block)
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, area, &mut list_state);
}
