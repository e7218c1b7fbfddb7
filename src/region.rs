//! Rozpoznawanie tożsamości (kraj, region) z właściwości obiektów GeoJSON.
//!
//! Pliki z różnych źródeł nazywają te same pola inaczej, więc sprawdzamy
//! stałą listę kluczy po kolei. Kolejność rozstrzyga remisy: klucze
//! bardziej szczegółowe przed ogólnymi.

use geojson::{Feature, JsonObject, JsonValue};

use crate::data::JurisdictionIdentity;

/// Klucze z nazwą regionu, w kolejności pierwszeństwa
pub const REGION_KEYS: [&str; 7] = ["region", "REGION", "name", "NAME", "STATE_NAME", "state", "STATE"];

pub const COUNTRY_KEYS: [&str; 2] = ["country", "COUNTRY"];

const KNOWN_EXTENSIONS: [&str; 2] = [".geojson", ".json"];

fn first_value(properties: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| properties.get(*key).and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn region_name(properties: &JsonObject) -> Option<String> {
    first_value(properties, &REGION_KEYS)
}

/// "new_zealand.geojson" → "New Zealand"
pub fn country_from_filename(filename: &str) -> Option<String> {
    // tylko nazwa pliku, bez ścieżki
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = KNOWN_EXTENSIONS
        .iter()
        .find_map(|ext| {
            let split = base.len().checked_sub(ext.len())?;
            let suffix = base.get(split..)?;
            suffix.eq_ignore_ascii_case(ext).then(|| &base[..split])
        })
        .unwrap_or(base);

    let words: Vec<String> = stem
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();

    if words.is_empty() { None } else { Some(words.join(" ")) }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Czysta funkcja: ta sama para wejść zawsze daje ten sam wynik.
pub fn resolve(properties: Option<&JsonObject>, source_filename: &str) -> Option<JurisdictionIdentity> {
    let properties = properties?;
    let region = region_name(properties)?;
    let country = first_value(properties, &COUNTRY_KEYS).or_else(|| country_from_filename(source_filename))?;
    Some(JurisdictionIdentity::new(country, region))
}

/// Jak `resolve`, ale uzupełnia brakujące pole `country` w obiekcie.
/// Geometrii nie ruszamy.
pub fn resolve_feature(feature: &mut Feature, source_filename: &str) -> Option<JurisdictionIdentity> {
    let identity = resolve(feature.properties.as_ref(), source_filename)?;
    let has_country = feature
        .properties
        .as_ref()
        .and_then(|p| first_value(p, &COUNTRY_KEYS))
        .is_some();
    if !has_country {
        feature.set_property("country", identity.country.clone());
    }
    Some(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn explicit_region_and_country() {
        let p = props(json!({"region": "California", "country": "United States"}));
        assert_eq!(
            resolve(Some(&p), "usa.geojson"),
            Some(JurisdictionIdentity::new("United States", "California"))
        );
    }

    #[test]
    fn country_from_filename_when_missing() {
        let p = props(json!({"NAME": "Ontario"}));
        assert_eq!(resolve(Some(&p), "canada.geojson"), Some(JurisdictionIdentity::new("Canada", "Ontario")));
    }

    #[test]
    fn key_order_breaks_ties() {
        let p = props(json!({"name": "generic", "REGION": "Queensland", "STATE": "QLD", "country": "Australia"}));
        assert_eq!(resolve(Some(&p), "").unwrap().region, "Queensland");
    }

    #[test]
    fn blank_values_are_skipped() {
        let p = props(json!({"region": "  ", "name": " Otago ", "country": "New Zealand"}));
        assert_eq!(resolve(Some(&p), "").unwrap().region, "Otago");
    }

    #[test]
    fn no_region_name_is_unresolved() {
        let p = props(json!({"id": 7, "country": "Canada"}));
        assert_eq!(resolve(Some(&p), "canada.geojson"), None);
        assert_eq!(resolve(None, "canada.geojson"), None);
    }

    #[test]
    fn filename_normalisation() {
        assert_eq!(country_from_filename("new_zealand.geojson").as_deref(), Some("New Zealand"));
        assert_eq!(country_from_filename("static/data/united-states.json").as_deref(), Some("United States"));
        assert_eq!(country_from_filename("SOUTH_AFRICA.GEOJSON").as_deref(), Some("South Africa"));
        assert_eq!(country_from_filename(".geojson"), None);
    }

    #[test]
    fn resolve_feature_fills_missing_country_only() {
        let mut feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(props(json!({"STATE_NAME": "Tasmania"}))),
            foreign_members: None,
        };
        let identity = resolve_feature(&mut feature, "australia.geojson").unwrap();
        assert_eq!(identity, JurisdictionIdentity::new("Australia", "Tasmania"));
        assert_eq!(feature.property("country").and_then(JsonValue::as_str), Some("Australia"));
    }
}
