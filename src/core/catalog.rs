//! The public model catalog, scraped from the library listing page.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::core::error::DaemonError;

pub const DEFAULT_CATALOG_URL: &str = "https://ollama.com/library?sort=popular";
pub const DEFAULT_LIMIT: usize = 25;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const NAME_WIDTH: usize = 25;
const SIZES_WIDTH: usize = 40;

static MODEL_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<li\b[^>]*\sx-test-model(?:[\s=][^>]*)?>(.*?)</li>"#)
        .expect("model item pattern is valid")
});
static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div\b[^>]*\sx-test-model-title(?:[\s=][^>]*)?>"#).expect("title tag pattern is valid")
});
static TITLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\stitle="([^"]*)""#).expect("title attr pattern is valid"));
static SIZE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span\b[^>]*\sx-test-size(?:[\s=][^>]*)?>([^<]*)<"#).expect("size pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogModel {
    pub name: String,
    pub sizes: Vec<String>,
}

pub async fn fetch_catalog(url: &str) -> Result<Vec<CatalogModel>, DaemonError> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(DaemonError::RequestFailed { status, body });
    }

    let page = response.text().await?;
    let models = parse_catalog(&page);
    debug!(url, count = models.len(), "Fetched model catalog");
    Ok(models)
}

/// Extracts every listed model that has both a title and at least one size.
pub fn parse_catalog(page: &str) -> Vec<CatalogModel> {
    MODEL_ITEM
        .captures_iter(page)
        .filter_map(|item| {
            let body = item.get(1)?.as_str();
            let tag = TITLE_TAG.find(body)?.as_str();
            let name = TITLE_ATTR.captures(tag)?.get(1)?.as_str();
            let name = html_escape::decode_html_entities(name).trim().to_string();

            let sizes: Vec<String> = SIZE_SPAN
                .captures_iter(body)
                .filter_map(|size| size.get(1))
                .map(|size| html_escape::decode_html_entities(size.as_str().trim()).into_owned())
                .filter(|size| !size.is_empty())
                .collect();

            (!name.is_empty() && !sizes.is_empty()).then_some(CatalogModel { name, sizes })
        })
        .collect()
}

/// Fixed-width table of at most `limit` models.
pub fn format_catalog_table(models: &[CatalogModel], limit: usize) -> String {
    let mut rows = vec![
        format!("{:<NAME_WIDTH$} {:<SIZES_WIDTH$}", "MODEL NAME", "SIZES"),
        format!(
            "{:<NAME_WIDTH$} {:<SIZES_WIDTH$}",
            "-".repeat(NAME_WIDTH),
            "-".repeat(SIZES_WIDTH)
        ),
    ];
    rows.extend(models.iter().take(limit).map(|model| {
        format!(
            "{:<NAME_WIDTH$} {:<SIZES_WIDTH$}",
            model.name,
            model.sizes.join(", ")
        )
    }));
    rows.join("\n")
}
