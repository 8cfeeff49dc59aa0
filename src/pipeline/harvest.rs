//! Link harvesting: listing page → ordered, de-duplicated PDF links.
//!
//! The listing page is fetched once. Any failure here aborts the run; there
//! is nothing to process without it.

use crate::error::AqError;
use crate::pipeline::fetch::pdf_file_name;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

static ANCHOR_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector should parse"));

const PDF_MARKER: &str = ".pdf";

/// Result of harvesting the listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    /// Every distinct PDF link, in first-seen order.
    pub pdf_links: Vec<String>,
    /// Links left after the block list was applied, one per file name.
    pub kept: Vec<String>,
    /// Unblocked links dropped because an earlier link saves to the same file.
    pub duplicates: Vec<String>,
}

impl Harvest {
    pub fn blocked(&self) -> usize {
        self.pdf_links.len() - self.kept.len() - self.duplicates.len()
    }
}

/// Fetch the listing page and return its filtered PDF links.
pub async fn harvest_links(
    client: &Client,
    listing_url: &str,
    block_list: &[String],
) -> Result<Harvest, AqError> {
    info!("Fetching listing page: {}", listing_url);
    let html = fetch_listing(client, listing_url).await?;

    let pdf_links = extract_pdf_links(&html);
    let (kept, duplicates) = dedupe_by_file_name(&filter_blocked(&pdf_links, block_list));
    info!(
        "Found {} PDF links, {} after block list and de-duplication",
        pdf_links.len(),
        kept.len()
    );

    Ok(Harvest {
        pdf_links,
        kept,
        duplicates,
    })
}

async fn fetch_listing(client: &Client, url: &str) -> Result<String, AqError> {
    let fail = |reason: String| AqError::ListingFetchFailed {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    response.text().await.map_err(|e| fail(e.to_string()))
}

/// All anchor `href`s containing `.pdf`, de-duplicated, first-seen order.
pub fn extract_pdf_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for href in document
        .select(&ANCHOR_HREF)
        .filter_map(|a| a.value().attr("href"))
    {
        if href.contains(PDF_MARKER) && !links.iter().any(|l| l == href) {
            links.push(href.to_string());
        }
    }

    debug!("Listing page has {} distinct PDF links", links.len());
    links
}

/// Drop every link that contains any blocked substring.
pub fn filter_blocked(links: &[String], block_list: &[String]) -> Vec<String> {
    links
        .iter()
        .filter(|link| !block_list.iter().any(|b| link.contains(b.as_str())))
        .cloned()
        .collect()
}

/// Keep the first link per saved file name; return `(kept, dropped)`.
///
/// Downloads are named after the link's last segment, so two links to
/// `Jan2020.pdf` in different folders would overwrite each other. Links
/// without a file name are kept and fail at download.
pub fn dedupe_by_file_name(links: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen: Vec<String> = Vec::new();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for link in links {
        match pdf_file_name(link) {
            Ok(name) if seen.contains(&name) => {
                warn!("Skipping {}: {} is already downloaded from another link", link, name);
                dropped.push(link.clone());
            }
            Ok(name) => {
                seen.push(name);
                kept.push(link.clone());
            }
            Err(_) => kept.push(link.clone()),
        }
    }

    (kept, dropped)
}
