//! Brand-based image tiers: the official site's OpenGraph image, a logo
//! service, and an image search. Each tier only finds a candidate URL;
//! downloading happens during rehosting.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::ImageTier;
use crate::http::{build_client, METADATA_TIMEOUT, PAGE_TIMEOUT};
use crate::product::ProductDraft;
use crate::text_processing::{alnum_lower, slugify};

/// Known brands whose domain cannot be derived from the name
const BRAND_ALIASES: &[(&str, &str)] = &[
    ("amazon prime", "primevideo.com"),
    ("prime video", "primevideo.com"),
    ("disney+ hotstar", "hotstar.com"),
    ("disney plus", "disneyplus.com"),
    ("hotstar", "hotstar.com"),
    ("youtube", "youtube.com"),
    ("sony liv", "sonyliv.com"),
    ("sonyliv", "sonyliv.com"),
    ("zee5", "zee5.com"),
    ("jiocinema", "jiocinema.com"),
    ("hbo max", "max.com"),
    ("apple tv", "tv.apple.com"),
    ("apple music", "music.apple.com"),
    ("chatgpt", "openai.com"),
    ("microsoft office", "microsoft.com"),
    ("office 365", "microsoft.com"),
    ("microsoft 365", "microsoft.com"),
    ("windows", "microsoft.com"),
    ("adobe", "adobe.com"),
    ("canva", "canva.com"),
    ("spotify", "spotify.com"),
    ("netflix", "netflix.com"),
    ("crunchyroll", "crunchyroll.com"),
    ("grammarly", "grammarly.com"),
    ("nordvpn", "nordvpn.com"),
    ("linkedin", "linkedin.com"),
    ("duolingo", "duolingo.com"),
];

/// Minimum length of an image-search hit worth trying
const MIN_SEARCH_URL_CHARS: usize = 20;

lazy_static! {
    static ref SEARCH_MEDIA_URL: Regex =
        Regex::new(r#"murl&quot;:&quot;(.*?)&quot;|"murl":"(.*?)""#).expect("valid murl pattern");
}

/// First word of the product name, which is the brand for nearly every
/// catalog entry ("Netflix Premium 4K" -> "Netflix")
pub fn short_brand_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '+'))
        .find(|word| !word.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Brand domain from the alias table, else `<slug>.com`
pub fn brand_domain(name: &str) -> Option<String> {
    let wanted = alnum_lower(name);
    if wanted.is_empty() {
        return None;
    }
    if let Some((_, domain)) = BRAND_ALIASES
        .iter()
        .find(|(alias, _)| wanted.starts_with(&alnum_lower(alias)))
    {
        return Some(domain.to_string());
    }
    let slug = slugify(&short_brand_name(name), "");
    if slug.is_empty() {
        None
    } else {
        Some(format!("{slug}.com"))
    }
}

/// `og:image` of a page, resolved against the page URL
pub fn extract_og_image(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(
        r#"meta[property="og:image"], meta[property="og:image:url"], meta[name="og:image"], meta[name="twitter:image"]"#,
    )
    .ok()?;
    let content = document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())?;

    let base = Url::parse(page_url).ok()?;
    base.join(content).ok().map(|url| url.to_string())
}

/// First usable media URL in an image-search results page
pub fn extract_search_image(html: &str) -> Option<String> {
    SEARCH_MEDIA_URL
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().replace("\\/", "/"))
        .find(|url| !url.starts_with("data:") && url.len() > MIN_SEARCH_URL_CHARS)
}

/// A brand tier that finds a candidate image URL for a draft
#[async_trait]
pub trait BrandImageSource: Send + Sync {
    fn tier(&self) -> ImageTier;

    async fn find(&self, draft: &ProductDraft) -> Option<String>;
}

/// OpenGraph image of the brand's home page
pub struct OfficialAsset {
    client: Client,
}

impl OfficialAsset {
    pub fn new() -> Self {
        Self {
            client: build_client(PAGE_TIMEOUT),
        }
    }
}

impl Default for OfficialAsset {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrandImageSource for OfficialAsset {
    fn tier(&self) -> ImageTier {
        ImageTier::OfficialAsset
    }

    async fn find(&self, draft: &ProductDraft) -> Option<String> {
        let home = format!("https://{}", brand_domain(&draft.name)?);
        let response = self.client.get(&home).send().await.ok()?;
        if !response.status().is_success() {
            debug!(url = %home, status = %response.status(), "Home page unavailable");
            return None;
        }
        let page_url = response.url().to_string();
        let html = response.text().await.ok()?;
        extract_og_image(&html, &page_url)
    }
}

/// Logo service addressed by domain
pub struct LogoService {
    base_url: String,
}

impl LogoService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BrandImageSource for LogoService {
    fn tier(&self) -> ImageTier {
        ImageTier::Logo
    }

    async fn find(&self, draft: &ProductDraft) -> Option<String> {
        let domain = brand_domain(&draft.name)?;
        Some(format!("{}/{}?size=512&format=png", self.base_url, domain))
    }
}

/// Image search for `"<brand> logo png"`
pub struct ImageSearch {
    endpoint: String,
    client: Client,
}

impl ImageSearch {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: build_client(METADATA_TIMEOUT),
        }
    }
}

#[async_trait]
impl BrandImageSource for ImageSearch {
    fn tier(&self) -> ImageTier {
        ImageTier::ImageSearch
    }

    async fn find(&self, draft: &ProductDraft) -> Option<String> {
        let brand = short_brand_name(&draft.name);
        if brand.is_empty() {
            return None;
        }
        let query = format!("{brand} logo png");
        let html = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;
        extract_search_image(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_brand_name() {
        assert_eq!(short_brand_name("Netflix Premium 4K"), "Netflix");
        assert_eq!(short_brand_name("  *Disney+* Hotstar"), "Disney+");
        assert_eq!(short_brand_name(""), "");
    }

    #[test]
    fn test_brand_domain() {
        assert_eq!(brand_domain("Prime Video 1 year").as_deref(), Some("primevideo.com"));
        assert_eq!(brand_domain("Windows 11 Pro").as_deref(), Some("microsoft.com"));
        assert_eq!(brand_domain("Notion Plus").as_deref(), Some("notion.com"));
        assert_eq!(brand_domain("!!!"), None);
    }

    #[test]
    fn test_extract_og_image_resolves_relative() {
        let html = r#"<html><head>
            <meta property="og:title" content="Netflix">
            <meta property="og:image" content="/images/share.png">
        </head></html>"#;
        assert_eq!(
            extract_og_image(html, "https://www.netflix.com/in/").as_deref(),
            Some("https://www.netflix.com/images/share.png")
        );
        assert_eq!(extract_og_image("<html></html>", "https://a.com"), None);
    }

    #[test]
    fn test_extract_search_image() {
        let html = concat!(
            r#"<a m="{&quot;murl&quot;:&quot;data:image/png;base64,AAAA&quot;}">"#,
            r#"<a m="{&quot;murl&quot;:&quot;https://x.co&quot;}">"#,
            r#"<a m="{&quot;murl&quot;:&quot;https://upload.example.org/logos/spotify.png&quot;}">"#,
        );
        assert_eq!(
            extract_search_image(html).as_deref(),
            Some("https://upload.example.org/logos/spotify.png")
        );
        assert_eq!(extract_search_image("<html></html>"), None);
    }

    #[tokio::test]
    async fn test_logo_service_url() {
        let logo = LogoService::new("https://logo.example.com/");
        let draft = ProductDraft::new("Spotify Premium");
        assert_eq!(
            logo.find(&draft).await.as_deref(),
            Some("https://logo.example.com/spotify.com?size=512&format=png")
        );
    }
}
