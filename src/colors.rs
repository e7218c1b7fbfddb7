use serde::Deserialize;
use std::{collections::BTreeMap, fmt, fs, path::Path, str::FromStr};

use crate::data::{JurisdictionIdentity, group_key};
use crate::error::{AtlasError, Result};

/// Kolor sRGB z zapisu `#rrggbb`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || AtlasError::Parse(format!("invalid colour {s:?}, expected #rrggbb"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(bad());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);

/// Styl rysowania jednego obiektu mapy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStyle {
    pub fill: Rgb,
    pub stroke: Rgb,
    pub weight: u8,
    pub fill_opacity: f32,
}

impl FeatureStyle {
    /// Pogrubiona ramka przy najechaniu / zaznaczeniu
    pub fn emphasized(self) -> Self {
        Self { weight: 2, fill_opacity: 0.9, ..self }
    }
}

/// Konfiguracja kolorów; można nadpisać plikiem palette.json
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub thresholds: Vec<u32>,
    pub ramps: Vec<Vec<String>>,
    /// klucz grupy → indeks rampy
    pub overrides: BTreeMap<String, usize>,
    pub no_data_color: String,
    pub suspended_fill: String,
    pub suspended_stroke: String,
}

impl Default for Palette {
    fn default() -> Self {
        let ramp = |colors: [&str; 7]| colors.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        Self {
            thresholds: vec![0, 100, 150, 200, 250, 300],
            ramps: vec![
                // czerwienie
                ramp(["#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#de2d26", "#a50f15"]),
                // zielenie
                ramp(["#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#005a32"]),
                // fiolety
                ramp(["#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#756bb1", "#54278f"]),
                // pomarańcze
                ramp(["#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801"]),
            ],
            overrides: [("United States", 0), ("Canada", 2), ("Australia", 1), ("New Zealand", 3)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            no_data_color: "#cccccc".to_string(),
            suspended_fill: "#ffffff".to_string(),
            suspended_stroke: "#cccccc".to_string(),
        }
    }
}

impl Palette {
    /// palette.json z katalogu danych, a jeśli go nie ma, wartości domyślne
    pub fn load_or_default<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let path = data_dir.as_ref().join("palette.json");
        match fs::read(&path) {
            Ok(bytes) => {
                let palette: Palette = serde_json::from_slice(&bytes)?;
                tracing::info!(path = %path.display(), ramps = palette.ramps.len(), "Loaded colour palette");
                Ok(palette)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Mapuje liczbę gatunków na kolor wypełnienia
#[derive(Clone, Debug)]
pub struct ChoroplethColorer {
    thresholds: Vec<u32>,
    ramps: Vec<Vec<Rgb>>,
    overrides: BTreeMap<String, usize>,
    no_data: Rgb,
    suspended: FeatureStyle,
}

/// Gdy ktoś wyzeruje listę ramp
const FALLBACK_SHADE: Rgb = Rgb(0xf0, 0xf0, 0xf0);

impl ChoroplethColorer {
    pub fn new(palette: &Palette) -> Result<Self> {
        if palette.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AtlasError::Config(format!(
                "palette thresholds must be strictly ascending, got {:?}",
                palette.thresholds
            )));
        }

        let mut ramps = Vec::with_capacity(palette.ramps.len());
        for (i, ramp) in palette.ramps.iter().enumerate() {
            if ramp.len() != palette.thresholds.len() + 1 {
                return Err(AtlasError::Config(format!(
                    "ramp {i} has {} colours, expected {}",
                    ramp.len(),
                    palette.thresholds.len() + 1
                )));
            }
            ramps.push(ramp.iter().map(|c| c.parse()).collect::<Result<Vec<Rgb>>>()?);
        }

        if let Some((key, idx)) = palette.overrides.iter().find(|(_, idx)| **idx >= ramps.len()) {
            return Err(AtlasError::Config(format!("override for {key:?} points at missing ramp {idx}")));
        }

        Ok(Self {
            thresholds: palette.thresholds.clone(),
            ramps,
            overrides: palette.overrides.clone(),
            no_data: palette.no_data_color.parse()?,
            suspended: FeatureStyle {
                fill: palette.suspended_fill.parse()?,
                stroke: palette.suspended_stroke.parse()?,
                weight: 1,
                fill_opacity: 0.3,
            },
        })
    }

    /// Indeks rampy: nadpisanie albo stabilny hash klucza grupy
    pub fn ramp_index(&self, group: &str) -> Option<usize> {
        if self.ramps.is_empty() {
            return None;
        }
        let key = if group.is_empty() { "default" } else { group };
        Some(match self.overrides.get(key) {
            Some(idx) => *idx,
            None => string_hash(key) as usize % self.ramps.len(),
        })
    }

    /// Numer przedziału: pierwszy próg przekroczony ściśle, licząc od góry
    pub fn bucket(&self, count: u32) -> usize {
        self.thresholds
            .iter()
            .rposition(|t| count > *t)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn color_for_group(&self, count: u32, group: &str) -> Rgb {
        match self.ramp_index(group) {
            Some(idx) => self.ramps[idx][self.bucket(count)],
            None => FALLBACK_SHADE,
        }
    }

    pub fn color_for(&self, count: u32, identity: &JurisdictionIdentity) -> Rgb {
        self.color_for_group(count, group_key(&identity.country))
    }

    pub fn style_for(&self, count: u32, identity: &JurisdictionIdentity) -> FeatureStyle {
        FeatureStyle { fill: self.color_for(count, identity), stroke: WHITE, weight: 1, fill_opacity: 0.7 }
    }

    /// Obiekt bez rozpoznanej nazwy
    pub fn no_data_style(&self) -> FeatureStyle {
        FeatureStyle { fill: self.no_data, stroke: WHITE, weight: 1, fill_opacity: 0.5 }
    }

    /// Wszystkie filtry wyłączone
    pub fn suspended_style(&self) -> FeatureStyle {
        self.suspended
    }

    pub fn ramp_count(&self) -> usize {
        self.ramps.len()
    }
}

/// 32-bitowy hash `h * 31 + c` po jednostkach UTF-16, wartość bezwzględna
pub fn string_hash(s: &str) -> u32 {
    let hash = s.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    hash.unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colorer() -> ChoroplethColorer {
        ChoroplethColorer::new(&Palette::default()).unwrap()
    }

    #[test]
    fn ladder_is_strictly_greater_than() {
        let c = colorer();
        let thresholds = [0u32, 100, 150, 200, 250, 300];
        for (i, t) in thresholds.iter().enumerate() {
            // t_{i-1} < c <= t_i → przedział i
            assert_eq!(c.bucket(*t), i, "at threshold {t}");
            assert_eq!(c.bucket(t + 1), i + 1, "just above {t}");
            if *t > 0 {
                assert_eq!(c.bucket(t - 1), i, "just below {t}");
            }
        }
        assert_eq!(c.bucket(10_000), 6);
    }

    #[test]
    fn colour_comes_from_the_group_ramp() {
        let c = colorer();
        let us = JurisdictionIdentity::new("United States", "Idaho");
        assert_eq!(c.color_for(0, &us), "#fff5f0".parse().unwrap());
        assert_eq!(c.color_for(101, &us), "#fcbba1".parse().unwrap());
        assert_eq!(c.color_for(301, &us), "#a50f15".parse().unwrap());
        let ca = JurisdictionIdentity::new("Canada", "Ontario");
        assert_eq!(c.color_for(1, &ca), "#efedf5".parse().unwrap());
    }

    #[test]
    fn eu_members_share_one_ramp() {
        let c = colorer();
        let fr = JurisdictionIdentity::new("France", "France");
        let de = JurisdictionIdentity::new("Germany", "Bavaria");
        for count in [0, 120, 500] {
            assert_eq!(c.color_for(count, &fr), c.color_for(count, &de));
        }
    }

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn empty_ramp_list_falls_back_to_grey() {
        let palette = Palette { ramps: vec![], overrides: BTreeMap::new(), ..Palette::default() };
        let c = ChoroplethColorer::new(&palette).unwrap();
        assert_eq!(c.color_for_group(50, "Chile"), FALLBACK_SHADE);
    }

    #[test]
    fn rejects_inconsistent_palettes() {
        let short = Palette { ramps: vec![vec!["#ffffff".into(); 3]], overrides: BTreeMap::new(), ..Palette::default() };
        assert!(matches!(ChoroplethColorer::new(&short), Err(AtlasError::Config(_))));

        let unsorted = Palette { thresholds: vec![0, 200, 100, 250, 300, 400], ..Palette::default() };
        assert!(ChoroplethColorer::new(&unsorted).is_err());

        assert!("#12345".parse::<Rgb>().is_err());
        assert_eq!("#a50F15".parse::<Rgb>().unwrap(), Rgb(0xa5, 0x0f, 0x15));
    }

    #[test]
    fn palette_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("palette.json"), r##"{"overrides": {"Chile": 1}}"##).unwrap();
        let palette = Palette::load_or_default(dir.path()).unwrap();
        assert_eq!(palette.overrides.get("Chile"), Some(&1));
        assert_eq!(palette.thresholds, Palette::default().thresholds);

        let missing = Palette::load_or_default(dir.path().join("nope")).unwrap();
        assert_eq!(missing.ramps.len(), 4);
    }
}
