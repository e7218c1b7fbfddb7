use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Tekst, którym baza oznacza brak angielskiej nazwy zwyczajowej
pub const COMMON_NAME_SENTINEL: &str = "No English common names available";

/// Nazwa grupy ponadnarodowej, w której kraje członkowskie dzielą jedną rampę
pub const EU_GROUP: &str = "European Union";

pub const EU_MEMBERS: [&str; 27] = [
    "Austria", "Belgium", "Bulgaria", "Croatia", "Cyprus", "Czechia",
    "Denmark", "Estonia", "Finland", "France", "Germany", "Greece",
    "Hungary", "Ireland", "Italy", "Latvia", "Lithuania", "Luxembourg",
    "Malta", "Netherlands", "Poland", "Portugal", "Romania", "Slovakia",
    "Slovenia", "Spain", "Sweden",
];

/// Klucz grupy jurysdykcji: nazwa kraju albo wspólna grupa UE
pub fn group_key(country: &str) -> &str {
    let country = country.trim();
    if country.eq_ignore_ascii_case("EU") || EU_MEMBERS.contains(&country) {
        EU_GROUP
    } else {
        country
    }
}

/// "EU" z API wyświetlamy pełną nazwą
pub fn display_country_name(country: &str) -> &str {
    let country = country.trim();
    if country.eq_ignore_ascii_case("EU") { EU_GROUP } else { country }
}

/// Tożsamość jurysdykcji: para (kraj, region)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JurisdictionIdentity {
    pub country: String,
    pub region: String,
}

impl JurisdictionIdentity {
    pub fn new(country: impl AsRef<str>, region: impl AsRef<str>) -> Self {
        Self {
            country: country.as_ref().trim().to_string(),
            region: region.as_ref().trim().to_string(),
        }
    }

    /// Klucz złożony `kraj::region`, rozróżnia wielkość liter
    pub fn key(&self) -> String {
        format!("{}::{}", self.country, self.region)
    }

    /// Wpis ogólnokrajowy bez podziału na regiony (np. Nowa Zelandia)
    pub fn is_country_level(&self) -> bool {
        self.region == self.country || self.region == group_key(&self.country)
    }

    pub fn country_label(&self) -> &str {
        display_country_name(&self.country)
    }

    /// "California, United States", ale "New Zealand" zamiast "New Zealand, New Zealand"
    pub fn display_label(&self) -> String {
        if self.country.is_empty() {
            self.region.clone()
        } else if self.is_country_level() {
            self.country_label().to_string()
        } else {
            format!("{}, {}", self.region, self.country_label())
        }
    }
}

impl fmt::Display for JurisdictionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_label())
    }
}

/// Rekord z /api/region-weed-counts
#[derive(Clone, Debug, Deserialize)]
pub struct CountRecord {
    pub country: String,
    pub region: String,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "CountRecord")]
pub struct RegulationCount {
    pub identity: JurisdictionIdentity,
    pub count: u32,
}

impl From<CountRecord> for RegulationCount {
    fn from(r: CountRecord) -> Self {
        Self { identity: JurisdictionIdentity::new(r.country, r.region), count: r.count.unwrap_or(0) }
    }
}

/// Liczniki gatunków po kluczu tożsamości; brak wpisu = 0
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegulationCounts {
    by_key: HashMap<String, u32>,
}

impl RegulationCounts {
    pub fn count_for(&self, identity: &JurisdictionIdentity) -> u32 {
        self.by_key.get(&identity.key()).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl FromIterator<RegulationCount> for RegulationCounts {
    fn from_iter<I: IntoIterator<Item = RegulationCount>>(iter: I) -> Self {
        let by_key = iter.into_iter().map(|c| (c.identity.key(), c.count)).collect();
        Self { by_key }
    }
}

/// Poziom regulacji wiersza (stare nazwy State/Province i Federal jako aliasy)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulationLevel {
    #[serde(alias = "State/Province", alias = "State")]
    Regional,
    #[serde(alias = "Federal")]
    National,
    International,
    /// Poziom, którego baza nie umiała przypisać
    #[serde(other)]
    Unknown,
}

/// Kategoria "Source" pokazywana w tabeli i w PDF
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceCategory {
    Regional,
    National,
    International,
    Multiple,
}

impl SourceCategory {
    pub fn label(self) -> &'static str {
        match self {
            SourceCategory::Regional => "Regional",
            SourceCategory::National => "National",
            SourceCategory::International => "International",
            SourceCategory::Multiple => "Multiple",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wiersz szczegółów regionu z /api/region
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SpeciesRegulationRow {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub canonical_name: String,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    pub level: RegulationLevel,
    #[serde(default, alias = "has_federal_regulation")]
    pub has_national_regulation: bool,
    #[serde(default)]
    pub has_international_regulation: bool,
}

impl SpeciesRegulationRow {
    /// Pierwszeństwo poziomów, nie suma zbiorów
    pub fn category(&self) -> SourceCategory {
        match self.level {
            RegulationLevel::Regional
                if self.has_national_regulation || self.has_international_regulation =>
            {
                SourceCategory::Multiple
            }
            RegulationLevel::Regional => SourceCategory::Regional,
            // nierozpoznany poziom liczymy jak krajowy, tak jak robi to stara tabela
            RegulationLevel::National | RegulationLevel::Unknown if self.has_international_regulation => {
                SourceCategory::Multiple
            }
            RegulationLevel::National | RegulationLevel::Unknown => SourceCategory::National,
            RegulationLevel::International => SourceCategory::International,
        }
    }

    /// Nazwa zwyczajowa albo "(nazwa łacińska)" przy braku / wartości zastępczej
    pub fn display_common_name(&self) -> String {
        match self.common_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() && !name.contains(COMMON_NAME_SENTINEL) => name.to_string(),
            _ => format!("({})", self.display_canonical_name()),
        }
    }

    pub fn display_canonical_name(&self) -> &str {
        let name = self.canonical_name.trim();
        if name.is_empty() { "Unknown" } else { name }
    }

    pub fn display_family_name(&self) -> &str {
        match self.family_name.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => f,
            _ => "Unknown",
        }
    }
}

/// Odpowiedź /api/region
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegionDetail {
    #[serde(default)]
    pub weeds: Vec<SpeciesRegulationRow>,
    /// Czy kraj ma jakiekolwiek regulacje, niezależnie od filtrów
    #[serde(default = "default_true")]
    pub has_any_data: bool,
}

fn default_true() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
