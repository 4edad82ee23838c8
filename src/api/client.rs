use super::cookies::load_cookie_header;
use super::types::{ApiConfig, ApiError, MatchStrictness, Metadata};
use super::MetadataProvider;
use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static HREF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
static VIDEO_TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)class="video-title"[^>]*>(.*?)</div>"#).unwrap());
static LEADING_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z0-9-]+)").unwrap());
static CURRENT_TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)class="current-title"[^>]*>(.*?)</strong>"#).unwrap());
static COVER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="[^"]*column-video-cover[^"]*".*?<img[^>]*\ssrc="([^"]+)""#).unwrap()
});
static LABEL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<strong[^>]*>(.*?)</strong>").unwrap());
static VALUE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)class="value"[^>]*>(.*?)</div>"#).unwrap());
static ANCHOR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a[^>]*>(.*?)</a>").unwrap());

/// One entry of the search result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Leading code of the entry title, as displayed
    pub code: String,
    pub href: String,
}

/// Labeled row of the detail page info panel
#[derive(Debug, Clone)]
struct PanelBlock {
    label: String,
    value_html: String,
}

/// HTML-scraping client for the JavDB catalog
pub struct JavdbClient {
    client: Client,
    config: ApiConfig,
}

impl JavdbClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(cookie_file) = &config.cookie_file {
            let cookies = load_cookie_header(cookie_file, config.host());
            if !cookies.is_empty() {
                let value = HeaderValue::from_str(&cookies)
                    .map_err(|e| ApiError::ParseError(format!("Invalid cookie value: {}", e)))?;
                headers.insert(COOKIE, value);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// GET a page, retrying transient failures with a linearly growing delay
    fn get_page(&self, url: &str) -> Result<String, ApiError> {
        let attempts = self.config.retry.max(1);
        let mut attempt = 1;

        loop {
            match self.get_page_once(url) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = Duration::from_millis(self.config.retry_delay_ms * attempt as u64);
                    warn!("Request to {} failed ({}), retrying in {:?}", url, e, delay);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn get_page_once(&self, url: &str) -> Result<String, ApiError> {
        debug!("Requesting: {}", url);

        let response = self.client.get(url).send()?;
        let status = response.status();

        debug!("Response status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        Ok(response.text()?)
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                href.trim_start_matches('/')
            )
        }
    }
}

impl MetadataProvider for JavdbClient {
    fn get_video_info(&self, code: &str) -> Result<Metadata, ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::EmptyCode);
        }

        info!("Searching catalog for {}", code);

        let search_url = Url::parse_with_params(
            &format!("{}/search", self.config.base_url.trim_end_matches('/')),
            &[("q", code), ("f", "all"), ("locale", "zh")],
        )
        .map_err(|e| ApiError::ParseError(format!("Invalid base URL: {}", e)))?;
        let search_html = self.get_page(search_url.as_str())?;
        let hits = parse_search_results(&search_html);

        debug!("Search for {} returned {} entries", code, hits.len());

        let hit = find_match(&hits, code, self.config.match_strictness)
            .ok_or_else(|| ApiError::NotFound(code.to_string()))?;

        let detail_url = self.absolute_url(&hit.href);
        let detail_html = self.get_page(&detail_url)?;
        let mut metadata = parse_detail(&detail_html, code)?;

        if metadata.cover_url.starts_with("//") {
            metadata.cover_url = format!("https:{}", metadata.cover_url);
        }

        info!("Fetched {}: {}", metadata.code, metadata.title);

        Ok(metadata)
    }
}

/// Pick the first hit whose code matches `code` under `strictness`
pub fn find_match<'a>(
    hits: &'a [SearchHit],
    code: &str,
    strictness: MatchStrictness,
) -> Option<&'a SearchHit> {
    let wanted = normalize_code(code);

    hits.iter().find(|hit| {
        let candidate = normalize_code(&hit.code);
        match strictness {
            MatchStrictness::Exact => candidate == wanted,
            MatchStrictness::Prefix => candidate.starts_with(&wanted),
        }
    })
}

fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Extract result entries from a search page
pub fn parse_search_results(html: &str) -> Vec<SearchHit> {
    html.split(r#"class="item""#)
        .skip(1)
        .filter_map(|chunk| {
            let href = HREF_REGEX.captures(chunk)?.get(1)?.as_str().to_string();
            let title = VIDEO_TITLE_REGEX.captures(chunk)?.get(1)?.as_str();
            let title = html_text(title);
            let code = LEADING_CODE_REGEX.captures(&title)?.get(1)?.as_str().to_string();
            Some(SearchHit { code, href })
        })
        .collect()
}

/// Extract metadata from a detail page
pub fn parse_detail(html: &str, requested: &str) -> Result<Metadata, ApiError> {
    let blocks = parse_panel_blocks(html);

    let text_of = |label: &str| {
        blocks
            .iter()
            .find(|b| b.label.contains(label))
            .map(|b| html_text(&b.value_html))
            .unwrap_or_default()
    };
    let links_of = |label: &str| {
        blocks
            .iter()
            .find(|b| b.label.contains(label))
            .map(|b| {
                ANCHOR_REGEX
                    .captures_iter(&b.value_html)
                    .filter_map(|c| c.get(1))
                    .map(|m| html_text(m.as_str()))
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default()
    };

    let code = text_of("番號").split_whitespace().collect::<String>();
    if code.is_empty() {
        return Err(ApiError::IncompleteData {
            code: requested.to_string(),
            field: "code".to_string(),
        });
    }

    let title = CURRENT_TITLE_REGEX
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| html_text(m.as_str()))
        .unwrap_or_default();

    let cover_url = COVER_REGEX
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    Ok(Metadata {
        code,
        title,
        release_date: text_of("日期"),
        duration: text_of("時長"),
        maker: text_of("片商"),
        series: text_of("系列"),
        rating: text_of("評分"),
        categories: links_of("類別"),
        actors: links_of("演員"),
        cover_url,
    })
}

fn parse_panel_blocks(html: &str) -> Vec<PanelBlock> {
    html.split(r#"class="panel-block"#)
        .skip(1)
        .filter_map(|chunk| {
            let label = html_text(LABEL_REGEX.captures(chunk)?.get(1)?.as_str());
            let value_html = VALUE_REGEX.captures(chunk)?.get(1)?.as_str().to_string();
            Some(PanelBlock { label, value_html })
        })
        .collect()
}

/// Strip tags, decode entities and collapse whitespace
fn html_text(fragment: &str) -> String {
    let stripped = TAG_REGEX.replace_all(fragment, "");
    let decoded = unescape_with(&stripped, |entity| match entity {
        "nbsp" => Some(" "),
        other => resolve_predefined_entity(other),
    })
    .map(|s| s.into_owned())
    .unwrap_or_else(|_| stripped.replace("&nbsp;", " "));

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
