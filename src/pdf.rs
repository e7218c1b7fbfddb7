//! Eksport tabeli regionu do PDF (printpdf, strony A4).

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};
use crate::report::ReportDocument;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const ROW_HEIGHT: f32 = 6.0;
const TABLE_TOP: f32 = PAGE_HEIGHT - 55.0;
const TABLE_BOTTOM: f32 = 25.0;
const COLUMN_WIDTHS: [f32; 4] = [55.0, 60.0, 40.0, 25.0];
const CELL_FONT_SIZE: f32 = 9.0;
/// przybliżona szerokość znaku Helvetiki 9pt w mm
const CHAR_WIDTH: f32 = 1.7;
const EMPTY_TABLE: &str = "No data available in table";

pub const BRANDING_DIR: &str = "branding";
pub const LOGO_FILES: [&str; 2] = ["ucd-logo.png", "unu-logo.png"];

/// Logotypy w nagłówku; brak pliku albo zły obraz nie blokuje eksportu
#[derive(Clone, Debug, Default)]
pub struct Branding {
    logos: Vec<(String, Vec<u8>)>,
}

impl Branding {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref().join(BRANDING_DIR);
        let mut logos = Vec::new();
        for name in LOGO_FILES {
            let path = dir.join(name);
            match fs::read(&path) {
                Ok(bytes) => logos.push((name.to_string(), bytes)),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "Logo unavailable, exporting without it"),
            }
        }
        Self { logos }
    }

    pub fn logo_count(&self) -> usize {
        self.logos.len()
    }

    /// Dekoduje logotypy raz na eksport; nieczytelne pomija
    fn decode(&self) -> Vec<Image> {
        self.logos
            .iter()
            .filter_map(|(name, bytes)| match decode_logo(bytes) {
                Ok(image) => Some(image),
                Err(err) => {
                    tracing::warn!(logo = %name, error = %err, "Skipping unreadable logo");
                    None
                }
            })
            .collect()
    }
}

fn decode_logo(bytes: &[u8]) -> Result<Image> {
    let decoder = PngDecoder::new(Cursor::new(bytes)).map_err(|e| AtlasError::Export(e.to_string()))?;
    Image::try_from(decoder).map_err(|e| AtlasError::Export(e.to_string()))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

/// Przycina tekst do liczby znaków mieszczącej się w kolumnie
fn fit_cell(text: &str, width: f32) -> String {
    let max = (width / CHAR_WIDTH) as usize;
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn rows_per_page() -> usize {
    (((TABLE_TOP - TABLE_BOTTOM) / ROW_HEIGHT) as usize).max(1)
}

pub fn page_count(document: &ReportDocument) -> usize {
    document.rows.len().div_ceil(rows_per_page()).max(1)
}

fn draw_header(layer: &PdfLayerReference, document: &ReportDocument, fonts: &Fonts, logos: &[Image]) {
    let mut x = MARGIN;
    for image in logos {
        Image::from(image.image.clone()).add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(PAGE_HEIGHT - MARGIN - 12.0)),
                dpi: Some(600.0),
                ..Default::default()
            },
        );
        x += 45.0;
    }

    layer.use_text(document.title.as_str(), 16.0, Mm(MARGIN), Mm(PAGE_HEIGHT - 35.0), &fonts.bold);
    layer.use_text(document.subtitle.as_str(), 11.0, Mm(MARGIN), Mm(PAGE_HEIGHT - 42.0), &fonts.italic);

    let mut x = MARGIN;
    for (label, width) in document.header.iter().zip(COLUMN_WIDTHS) {
        layer.use_text(*label, 10.0, Mm(x), Mm(TABLE_TOP + 2.0), &fonts.bold);
        x += width;
    }
}

fn draw_footer(layer: &PdfLayerReference, document: &ReportDocument, fonts: &Fonts, page: usize, pages: usize) {
    layer.use_text(document.footer.as_str(), 8.0, Mm(MARGIN), Mm(12.0), &fonts.italic);
    let number = format!("Page {page} of {pages}");
    layer.use_text(number, 8.0, Mm(PAGE_WIDTH - MARGIN - 20.0), Mm(12.0), &fonts.regular);
}

/// Składa dokument w pamięci; nagłówek tabeli i stopka na każdej stronie
pub fn render(document: &ReportDocument, branding: &Branding) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(document.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
    };

    let logos = branding.decode();
    let pages = page_count(document);
    let mut chunks: Vec<&[crate::report::ReportRow]> = document.rows.chunks(rows_per_page()).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    for (index, rows) in chunks.iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", index + 1))
        };
        let layer = doc.get_page(page).get_layer(layer);
        draw_header(&layer, document, &fonts, &logos);

        if rows.is_empty() {
            layer.use_text(EMPTY_TABLE, CELL_FONT_SIZE, Mm(MARGIN), Mm(TABLE_TOP - ROW_HEIGHT), &fonts.italic);
        }
        let mut y = TABLE_TOP - ROW_HEIGHT;
        for row in rows.iter() {
            let mut x = MARGIN;
            for (cell, width) in row.cells().iter().zip(COLUMN_WIDTHS) {
                layer.use_text(fit_cell(cell, width), CELL_FONT_SIZE, Mm(x), Mm(y), &fonts.regular);
                x += width;
            }
            y -= ROW_HEIGHT;
        }

        draw_footer(&layer, document, &fonts, index + 1, pages);
    }

    Ok(doc.save_to_bytes()?)
}

/// Zapisuje PDF w katalogu eksportu pod nazwą z dokumentu
pub fn export<P: AsRef<Path>>(document: &ReportDocument, branding: &Branding, dir: P) -> Result<PathBuf> {
    let bytes = render(document, branding)?;
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(&document.filename);
    fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), rows = document.rows.len(), "Exported report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SourceCategory;
    use crate::report::{COLUMNS, ReportRow};

    fn document(rows: usize) -> ReportDocument {
        ReportDocument {
            title: "Regulated Plants in Victoria, Australia".into(),
            subtitle: "Regional, National and International regulation".into(),
            header: COLUMNS,
            rows: (0..rows)
                .map(|i| ReportRow {
                    scientific_name: format!("Species {i}"),
                    common_name: "(Species)".into(),
                    family: "Poaceae".into(),
                    source: SourceCategory::Regional,
                })
                .collect(),
            footer: "Provided by Regulated Plants Database, data is correct as of March 5, 2026".into(),
            filename: "Regulated_Plants_Victoria_2026-03-05.pdf".into(),
        }
    }

    #[test]
    fn long_cells_are_cut() {
        assert_eq!(fit_cell("Poaceae", 40.0), "Poaceae");
        let cut = fit_cell(&"x".repeat(100), 25.0);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= (25.0 / CHAR_WIDTH) as usize);
    }

    #[test]
    fn rows_spill_onto_more_pages() {
        assert_eq!(page_count(&document(0)), 1);
        assert_eq!(page_count(&document(rows_per_page())), 1);
        assert_eq!(page_count(&document(rows_per_page() + 1)), 2);
    }

    #[test]
    fn renders_without_branding() {
        let bytes = render(&document(80), &Branding::none()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn broken_or_missing_logos_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let branding_dir = dir.path().join(BRANDING_DIR);
        fs::create_dir_all(&branding_dir).unwrap();
        fs::write(branding_dir.join(LOGO_FILES[0]), b"not a png").unwrap();

        let branding = Branding::load(dir.path());
        assert_eq!(branding.logo_count(), 1);
        let path = export(&document(3), &branding, dir.path().join("out")).unwrap();
        assert!(path.ends_with("Regulated_Plants_Victoria_2026-03-05.pdf"));
        assert!(fs::read(path).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn unreadable_logo_is_dropped_once_for_all_pages() {
        let branding = Branding { logos: vec![(LOGO_FILES[1].to_string(), b"\x89PNG broken".to_vec())] };
        assert!(branding.decode().is_empty());

        let document = document(rows_per_page() * 3);
        assert_eq!(page_count(&document), 3);
        let bytes = render(&document, &branding).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
