use std::collections::BTreeMap;
use std::fmt;

/// Przełączniki poziomu regulacji
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterFlag {
    Region,
    National,
    International,
}

impl FilterFlag {
    /// Kolejność kanoniczna
    pub const ALL: [FilterFlag; 3] = [FilterFlag::Region, FilterFlag::National, FilterFlag::International];

    pub fn query_key(self) -> &'static str {
        match self {
            FilterFlag::Region => "includeRegion",
            FilterFlag::National => "includeNational",
            FilterFlag::International => "includeInternational",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterFlag::Region => "Regional",
            FilterFlag::National => "National",
            FilterFlag::International => "International",
        }
    }
}

impl fmt::Display for FilterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const SUSPENDED_SCOPE: &str = "No regulation level selected";

/// Stan filtrów na czas sesji; domyślnie wszystko włączone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub region: bool,
    pub national: bool,
    pub international: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self { region: true, national: true, international: true }
    }
}

impl FilterState {
    pub fn is_enabled(&self, flag: FilterFlag) -> bool {
        match flag {
            FilterFlag::Region => self.region,
            FilterFlag::National => self.national,
            FilterFlag::International => self.international,
        }
    }

    pub fn set(&mut self, flag: FilterFlag, enabled: bool) {
        match flag {
            FilterFlag::Region => self.region = enabled,
            FilterFlag::National => self.national = enabled,
            FilterFlag::International => self.international = enabled,
        }
    }

    pub fn toggle(&mut self, flag: FilterFlag) {
        let enabled = self.is_enabled(flag);
        self.set(flag, !enabled);
    }

    /// Żaden poziom nie jest aktywny
    pub fn is_suspended(&self) -> bool {
        !(self.region || self.national || self.international)
    }

    pub fn active_flags(&self) -> impl Iterator<Item = FilterFlag> + '_ {
        FilterFlag::ALL.into_iter().filter(move |f| self.is_enabled(*f))
    }

    /// Zawsze wszystkie trzy klucze, także w trybie zawieszonym
    pub fn to_query_params(&self) -> BTreeMap<&'static str, String> {
        FilterFlag::ALL
            .into_iter()
            .map(|f| (f.query_key(), self.is_enabled(f).to_string()))
            .collect()
    }

    /// `includeRegion=true&includeNational=false&...` bez `?`
    pub fn to_query_string(&self) -> String {
        FilterFlag::ALL
            .into_iter()
            .map(|f| format!("{}={}", f.query_key(), self.is_enabled(f)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn describe_scope(&self) -> String {
        let names: Vec<&str> = self.active_flags().map(FilterFlag::label).collect();
        match names.as_slice() {
            [] => SUSPENDED_SCOPE.to_string(),
            [only] => format!("{only} regulation only"),
            [init @ .., last] => format!("{} and {last} regulation", init.join(", ")),
        }
    }
}
