use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Polygon, Rect};
use geojson::FeatureCollection;
use ratatui::layout::Rect as TuiRect;
use ratatui::style::Color;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line, Points};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::colors::{FeatureStyle, Rgb};
use crate::data::JurisdictionIdentity;
use crate::error::{AtlasError, Result};
use crate::region;

/// Siatka próbek do wypełniania wielokątów w terminalu
const FILL_COLUMNS: usize = 240;
const FILL_ROWS: usize = 120;

/// Jeden plik GeoJSON razem z nazwą, z której odczytujemy kraj
#[derive(Clone, Debug)]
pub struct GeographySource {
    pub filename: String,
    pub collection: FeatureCollection,
}

/// Liczy pole (w przybliżeniu płaskim) wielokąta wzorem shoelace'a.
fn poly_area(poly: &Polygon<f64>) -> f64 {
    let coords = &poly.exterior().0;
    let mut sum = 0.0;
    for window in coords.windows(2) {
        let a = window[0];
        let b = window[1];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum * 0.5).abs()
}

/// Odrzuca drobne wysepki, jeśli kształt ma ich wiele
fn drop_small_parts(mp: MultiPolygon<f64>) -> MultiPolygon<f64> {
    if mp.0.len() <= 1 {
        return mp;
    }
    let areas: Vec<f64> = mp.0.iter().map(poly_area).collect();
    let max_area = areas.iter().cloned().fold(0.0, f64::max);
    let threshold = max_area * 0.20;
    let filtered: Vec<Polygon<f64>> = mp
        .0
        .iter()
        .zip(areas)
        .filter(|(_, area)| *area >= threshold)
        .map(|(poly, _)| poly.clone())
        .collect();
    if filtered.is_empty() { mp } else { MultiPolygon(filtered) }
}

/// Obiekt warstwy: kształt i (jeśli się udało) rozpoznana tożsamość
#[derive(Clone, Debug)]
pub struct MapFeature {
    pub identity: Option<JurisdictionIdentity>,
    pub shape: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
    fill: Vec<(f64, f64)>,
}

impl MapFeature {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let inside_bbox = self.bbox.is_some_and(|b| {
            x >= b.min().x && x <= b.max().x && y >= b.min().y && y <= b.max().y
        });
        inside_bbox && self.shape.contains(&Point::new(x, y))
    }
}

/// Przygotowanie geometrii i rysowanie mapy
#[derive(Clone, Debug)]
pub struct MapView {
    items: Vec<MapFeature>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl MapView {
    /// Scala wszystkie źródła w jedną warstwę
    pub fn from_sources(sources: Vec<GeographySource>) -> Result<Self> {
        let mut items = Vec::new();
        let mut unresolved = 0usize;

        for source in sources {
            for mut feature in source.collection.features {
                let identity = region::resolve_feature(&mut feature, &source.filename);
                if identity.is_none() {
                    unresolved += 1;
                }

                let Some(gj) = feature.geometry else { continue };
                let geom = Geometry::<f64>::try_from(gj.value)
                    .map_err(|e| AtlasError::Geometry(format!("{}: {e}", source.filename)))?;
                let mp = match geom {
                    Geometry::Polygon(p) => p.into(),
                    Geometry::MultiPolygon(m) => m,
                    _ => continue,
                };

                let shape = drop_small_parts(mp);
                let bbox = shape.bounding_rect();
                items.push(MapFeature { identity, shape, bbox, fill: Vec::new() });
            }
        }

        if unresolved > 0 {
            tracing::debug!(unresolved, "Features without a region name are not interactive");
        }

        // Ustal zakresy współrzędnych
        let (mut minx, mut miny, mut maxx, mut maxy) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for item in &items {
            if let Some(b) = item.bbox {
                minx = minx.min(b.min().x);
                miny = miny.min(b.min().y);
                maxx = maxx.max(b.max().x);
                maxy = maxy.max(b.max().y);
            }
        }
        if !(minx < maxx && miny < maxy) {
            (minx, miny, maxx, maxy) = (-180.0, -90.0, 180.0, 90.0);
        }

        let mut view = Self { items, x_bounds: [minx, maxx], y_bounds: [miny, maxy] };
        view.sample_fill();
        Ok(view)
    }

    /// Punkty wypełnienia: środki komórek siatki leżące wewnątrz obiektu
    fn sample_fill(&mut self) {
        let dx = (self.x_bounds[1] - self.x_bounds[0]) / FILL_COLUMNS as f64;
        let dy = (self.y_bounds[1] - self.y_bounds[0]) / FILL_ROWS as f64;
        for col in 0..FILL_COLUMNS {
            let x = self.x_bounds[0] + (col as f64 + 0.5) * dx;
            for row in 0..FILL_ROWS {
                let y = self.y_bounds[0] + (row as f64 + 0.5) * dy;
                if let Some(item) = self.items.iter_mut().find(|i| i.contains(x, y)) {
                    item.fill.push((x, y));
                }
            }
        }
    }

    /// Liczba obiektów (regionów)
    pub fn feature_count(&self) -> usize {
        self.items.len()
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.items
    }

    pub fn feature(&self, index: usize) -> Option<&MapFeature> {
        self.items.get(index)
    }

    pub fn identity(&self, index: usize) -> Option<&JurisdictionIdentity> {
        self.items.get(index).and_then(|f| f.identity.as_ref())
    }

    /// Obiekt pod punktem (lon, lat)
    pub fn feature_at(&self, x: f64, y: f64) -> Option<usize> {
        self.items.iter().position(|f| f.contains(x, y))
    }

    /// Indeksy obiektów z rozpoznaną tożsamością, posortowane po etykiecie
    pub fn resolved_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.items.len()).filter(|i| self.identity(*i).is_some()).collect();
        indices.sort_by_cached_key(|i| self.identity(*i).map(|id| id.display_label()).unwrap_or_default());
        indices
    }

    /// Zamienia pozycję komórki terminala na współrzędne mapy
    pub fn coord_at(&self, area: TuiRect, column: u16, row: u16) -> Option<(f64, f64)> {
        // wnętrze bez ramki
        let inner = TuiRect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width.saturating_sub(2),
            height: area.height.saturating_sub(2),
        };
        if inner.width == 0 || inner.height == 0 {
            return None;
        }
        if column < inner.x || column >= inner.x + inner.width || row < inner.y || row >= inner.y + inner.height {
            return None;
        }
        let fx = (f64::from(column - inner.x) + 0.5) / f64::from(inner.width);
        let fy = (f64::from(row - inner.y) + 0.5) / f64::from(inner.height);
        let x = self.x_bounds[0] + fx * (self.x_bounds[1] - self.x_bounds[0]);
        let y = self.y_bounds[1] - fy * (self.y_bounds[1] - self.y_bounds[0]);
        Some((x, y))
    }

    /// Rysuje mapę: wypełnienie i granice, a na osobnej warstwie wyróżnione obiekty
    pub fn render<S>(&self, f: &mut Frame, area: TuiRect, title: &str, style_for: S)
    where
        S: Fn(usize) -> FeatureStyle,
    {
        let styles: Vec<FeatureStyle> = (0..self.items.len()).map(&style_for).collect();
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds(self.x_bounds)
            .y_bounds(self.y_bounds)
            .paint(|ctx| {
                // 1) wypełnienie kolorem kartogramu
                for (item, style) in self.items.iter().zip(&styles) {
                    if !item.fill.is_empty() {
                        ctx.draw(&Points { coords: &item.fill, color: shade(style.fill, style.fill_opacity) });
                    }
                }
                ctx.layer();

                // 2) granice
                for (item, style) in self.items.iter().zip(&styles) {
                    if style.weight <= 1 {
                        draw_outline(ctx, &item.shape, to_color(style.stroke));
                    }
                }
                ctx.layer();

                // 3) wyróżnione (najechany / wybrany) na wierzchu
                for (item, style) in self.items.iter().zip(&styles) {
                    if style.weight > 1 {
                        draw_outline(ctx, &item.shape, Color::Red);
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

fn draw_outline(ctx: &mut ratatui::widgets::canvas::Context<'_>, shape: &MultiPolygon<f64>, color: Color) {
    for poly in &shape.0 {
        let ring = &poly.exterior().0;
        for window in ring.windows(2) {
            let a = window[0];
            let b = window[1];
            ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color });
        }
        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            ctx.draw(&Line { x1: last.x, y1: last.y, x2: first.x, y2: first.y, color });
        }
    }
}

pub fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Przezroczystość na ciemnym tle terminala
pub fn shade(rgb: Rgb, opacity: f32) -> Color {
    let k = opacity.clamp(0.0, 1.0);
    let scale = |c: u8| (f32::from(c) * k).round() as u8;
    Color::Rgb(scale(rgb.0), scale(rgb.1), scale(rgb.2))
}
