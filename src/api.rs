use futures::future::join_all;
use geojson::{FeatureCollection, GeoJson};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::data::{JurisdictionIdentity, RegionDetail, RegulationCount};
use crate::error::{AtlasError, Result};
use crate::filters::FilterState;
use crate::map_draw::GeographySource;
use crate::species::SpeciesMatch;

/// Klient tylko-do-odczytu API bazy roślin regulowanych
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    geojson_path: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geojson_path: config.geojson_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_response(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AtlasError::Api { status: status.as_u16(), message });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self.get_response(url, query).await?;
        Ok(resp.json().await?)
    }

    fn filter_query(filters: &FilterState) -> Vec<(&'static str, String)> {
        filters.to_query_params().into_iter().collect()
    }

    /// Liczniki gatunków dla każdej pary (kraj, region)
    pub async fn region_counts(&self, filters: &FilterState) -> Result<Vec<RegulationCount>> {
        let url = self.url("/api/region-weed-counts");
        let counts: Vec<RegulationCount> = self.get_json(&url, &Self::filter_query(filters)).await?;
        tracing::debug!(count = counts.len(), "Fetched region counts");
        Ok(counts)
    }

    pub async fn geojson_files(&self) -> Result<Vec<String>> {
        self.get_json(&self.url("/api/geojson-files"), &[]).await
    }

    pub async fn geojson(&self, filename: &str) -> Result<FeatureCollection> {
        let url = self.url(&format!("{}{}", self.geojson_path, filename));
        let text = self.get_response(&url, &[]).await?.text().await?;
        let gj: GeoJson = text.parse().map_err(|e: geojson::Error| AtlasError::Parse(format!("{filename}: {e}")))?;
        FeatureCollection::try_from(gj).map_err(|e| AtlasError::Parse(format!("{filename}: {e}")))
    }

    /// Lista plików, potem wszystkie pliki naraz. Błąd pojedynczego pliku
    /// daje pustą kolekcję, błąd listy przerywa całe ładowanie.
    pub async fn geography(&self) -> Result<Vec<GeographySource>> {
        let files = self.geojson_files().await?;
        tracing::info!(files = files.len(), "Fetching geography sources");

        let fetches = files.iter().map(|filename| async move {
            let collection = match self.geojson(filename).await {
                Ok(collection) => collection,
                Err(err) => {
                    tracing::warn!(filename = %filename, error = %err, "Skipping geography source");
                    FeatureCollection { bbox: None, features: Vec::new(), foreign_members: None }
                }
            };
            GeographySource { filename: filename.clone(), collection }
        });
        Ok(join_all(fetches).await)
    }

    pub async fn region_detail(&self, identity: &JurisdictionIdentity, filters: &FilterState) -> Result<RegionDetail> {
        let mut query = vec![("country", identity.country.clone()), ("region", identity.region.clone())];
        query.extend(Self::filter_query(filters));
        self.get_json(&self.url("/api/region"), &query).await
    }

    pub async fn search_species(&self, term: &str) -> Result<Vec<SpeciesMatch>> {
        self.get_json(&self.url("/species/api/search"), &[("q", term.to_string())]).await
    }

    /// Grupa (kraj albo np. EU) → nazwy jurysdykcji
    pub async fn species_jurisdictions(&self, usage_key: i64) -> Result<BTreeMap<String, Vec<String>>> {
        let url = self.url(&format!("/species/api/weed-states/by-key/{usage_key}"));
        self.get_json(&url, &[]).await
    }
}
