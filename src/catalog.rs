use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// A bibliographic edition as returned by `/isbn/{isbn}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Edition {
    pub key: String,
    #[serde(default)]
    pub works: Vec<WorkRef>,
}

impl Edition {
    pub fn work_key(&self) -> anyhow::Result<&str> {
        let work = self
            .works
            .first()
            .ok_or_else(|| anyhow::anyhow!("no work attached to edition {}", self.key))?;
        Ok(&work.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkRef {
    pub key: String,
}

/// A catalog work. `subjects` and `links` are absent until first written;
/// everything else round-trips through `rest` so a save never strips fields
/// this bot does not model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<WorkLink>>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLink {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LinkType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    pub key: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    access: String,
    secret: String,
}

pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    dry_run: bool,
}

impl CatalogClient {
    /// Credentials come from `CATALOG_ACCESS_KEY`/`CATALOG_SECRET_KEY` when
    /// both are set; lookups and dry runs work without them.
    pub fn new(base_url: &str, dry_run: bool) -> anyhow::Result<Self> {
        let credentials = match (
            std::env::var("CATALOG_ACCESS_KEY"),
            std::env::var("CATALOG_SECRET_KEY"),
        ) {
            (Ok(access), Ok(secret)) => Some(Credentials { access, secret }),
            _ => None,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build catalog http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
            dry_run,
        })
    }

    /// Looks up the edition for an ISBN. Absence is `Ok(None)`, not an error.
    pub async fn edition_by_isbn(&self, isbn: &str) -> anyhow::Result<Option<Edition>> {
        let url = format!("{}/isbn/{isbn}.json", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("catalog lookup failed ({status}): {url}");
        }

        let edition = response
            .json::<Edition>()
            .await
            .with_context(|| format!("parse edition: {url}"))?;
        Ok(Some(edition))
    }

    pub async fn work(&self, key: &str) -> anyhow::Result<Work> {
        let url = format!("{}{key}.json", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("catalog work fetch failed ({status}): {url}");
        }

        response
            .json::<Work>()
            .await
            .with_context(|| format!("parse work: {url}"))
    }

    pub async fn save_work(&self, work: &Work, comment: &str) -> anyhow::Result<()> {
        let url = format!("{}{}.json", self.base_url, work.key);
        if self.dry_run {
            tracing::info!(work = %work.key, "dry run: skipping save");
            return Ok(());
        }

        let mut request = self
            .http
            .put(&url)
            .query(&[("comment", comment)])
            .json(work);
        if let Some(credentials) = &self.credentials {
            request = request.header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}:{}", credentials.access, credentials.secret),
            );
        }

        let response = request.send().await.with_context(|| format!("PUT {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("catalog save failed ({status}): {url}");
        }

        tracing::info!(work = %work.key, "work saved");
        Ok(())
    }

    /// Fire-and-forget: the catalog imports the edition in the background and
    /// this run never waits for it to land. Network failures are logged, not
    /// propagated.
    pub async fn request_import(&self, isbn: &str) {
        let url = format!("{}/isbn/{isbn}", self.base_url);
        if self.dry_run {
            tracing::info!(%url, "dry run: skipping import request");
            return;
        }

        match self.http.get(&url).send().await {
            Ok(_) => tracing::info!(%url, "requested import"),
            Err(err) => tracing::error!(%url, ?err, "import request failed"),
        }
    }
}
