//! TMDB (The Movie Database) API client.
//!
//! Anime and shows are both looked up as TV series; movies use the movie
//! endpoints. Requires an API key.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{MetadataProvider, ProviderError};
use crate::config::TmdbConfig;
use crate::domain::{MediaKind, TitleId};
use crate::models::metadata::{SearchHit, SeasonInfo, TitleMetadata};

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("Mediarr/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    const fn endpoint(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Anime | MediaKind::Show => "tv",
            MediaKind::Movie => "movie",
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let params = [
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        let full = Url::parse_with_params(url, params.iter().chain(query))
            .map_err(|e| ProviderError::Parse(format!("invalid url {url}: {e}")))?;

        let response = self.client.get(full).send().await?;
        let response = check_status(response, url).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("{url}: {e}")))
    }
}

async fn check_status(response: Response, url: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status == 401 {
        return Err(ProviderError::NotConfigured(
            "Invalid TMDB API key".to_string(),
        ));
    }
    if status == 404 {
        return Err(ProviderError::NotFound(url.to_string()));
    }
    if status == 429 {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response)
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>, ProviderError> {
        let url = format!("{}/search/{}", self.base_url, Self::endpoint(kind));
        debug!("TMDB search: kind={}, query='{}'", kind, query);

        let page: SearchPage = self.get_json(&url, &[("query", query)]).await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|r| {
                let name = r.name.or(r.title)?;
                Some(SearchHit {
                    id: TitleId::new(r.id),
                    name,
                })
            })
            .collect())
    }

    async fn fetch(&self, id: TitleId, kind: MediaKind) -> Result<TitleMetadata, ProviderError> {
        let url = format!("{}/{}/{}", self.base_url, Self::endpoint(kind), id);
        debug!("TMDB fetch: kind={}, id={}", kind, id);

        let record: TitleRecord = self
            .get_json(&url, &[("append_to_response", "alternative_titles,translations")])
            .await?;
        record.into_metadata(kind)
    }
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    id: u64,
    name: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct TitleRecord {
    id: u64,
    name: Option<String>,
    title: Option<String>,
    #[serde(default)]
    seasons: Vec<SeasonRecord>,
    #[serde(default)]
    alternative_titles: AlternativeTitles,
    #[serde(default)]
    translations: Translations,
}

#[derive(Deserialize)]
struct SeasonRecord {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
}

/// TV responses list alternatives under `results`, movies under `titles`.
#[derive(Deserialize, Default)]
struct AlternativeTitles {
    #[serde(default, alias = "titles")]
    results: Vec<AlternativeTitle>,
}

#[derive(Deserialize)]
struct AlternativeTitle {
    title: String,
}

#[derive(Deserialize, Default)]
struct Translations {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    #[serde(default)]
    data: TranslationData,
}

#[derive(Deserialize, Default)]
struct TranslationData {
    name: Option<String>,
    title: Option<String>,
}

impl TitleRecord {
    fn into_metadata(self, kind: MediaKind) -> Result<TitleMetadata, ProviderError> {
        let name = self
            .name
            .or(self.title)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ProviderError::Parse(format!("title {} has no name", self.id)))?;

        let seasons = if kind.is_episodic() {
            self.seasons
                .into_iter()
                .map(|s| SeasonInfo {
                    number: s.season_number,
                    episode_count: s.episode_count,
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut translations: Vec<String> = self
            .translations
            .translations
            .into_iter()
            .filter_map(|t| t.data.name.or(t.data.title))
            .filter(|t| !t.is_empty())
            .collect();
        translations.sort();
        translations.dedup();

        Ok(TitleMetadata {
            id: TitleId::new(self.id),
            name,
            kind,
            seasons,
            alternate_titles: self
                .alternative_titles
                .results
                .into_iter()
                .map(|a| a.title)
                .collect(),
            translations,
        })
    }
}
