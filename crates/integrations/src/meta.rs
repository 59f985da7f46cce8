//! Marketing Graph API client.
//!
//! Ads are read from the `ads` edge with campaign, ad set, creative and the
//! insight block expanded inline; the trend comes from the account
//! `insights` edge at daily granularity. Both follow `paging.next` until the
//! platform stops returning a cursor.

use adlens_core::config::MetaConfig;
use adlens_core::types::{AccountRef, DateSelection, RawAdRecord, RawDailyRecord, ReportFilters};
use adlens_core::{InsightsSource, ReportError, ReportResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const INSIGHT_FIELDS: &str = "spend,clicks,inline_link_clicks,impressions,reach,cpm,ctr,\
inline_link_click_ctr,frequency,purchase_roas,actions,action_values,\
video_p25_watched_actions,video_p50_watched_actions,video_p75_watched_actions,\
video_p95_watched_actions,video_p100_watched_actions";

const CREATIVE_FIELDS: &str = "id,image_url,thumbnail_url,title,body,object_story_spec";

const TREND_FIELDS: &str =
    "date_start,date_stop,spend,impressions,clicks,inline_link_clicks,actions,action_values";

/// Graph error codes for throttling.
const RATE_LIMIT_CODES: &[i64] = &[4, 17, 32, 613, 80004];

/// Graph error code for an invalid or expired access token.
const INVALID_TOKEN_CODE: i64 = 190;

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    paging: Option<GraphPaging>,
}

#[derive(Debug, Deserialize)]
struct GraphPaging {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

// ─── Client ─────────────────────────────────────────────────────────────────

pub struct MetaGraphClient {
    http: reqwest::Client,
    config: MetaConfig,
}

impl MetaGraphClient {
    pub fn new(config: MetaConfig) -> ReportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ReportError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Per-report token first, then the server-wide one.
    fn token<'a>(&'a self, account: &'a AccountRef) -> ReportResult<&'a str> {
        account
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| self.config.usable_token())
            .ok_or_else(|| ReportError::Unauthorized("no ads platform access token configured".into()))
    }

    fn edge_url(&self, account: &AccountRef, edge: &str, params: &[(&str, String)]) -> ReportResult<Url> {
        let raw = format!(
            "{}/{}/{}/{}",
            self.config.graph_base_url.trim_end_matches('/'),
            self.config.api_version.trim_matches('/'),
            account.account_id,
            edge
        );
        Url::parse_with_params(&raw, params)
            .map_err(|e| ReportError::Config(format!("invalid Graph API url '{raw}': {e}")))
    }

    pub(crate) fn ads_url(&self, account: &AccountRef, filters: &ReportFilters) -> ReportResult<Url> {
        let token = self.token(account)?;
        let fields = format!(
            "id,name,status,effective_status,campaign{{id,name,status}},adset{{id,name,status}},\
creative{{{CREATIVE_FIELDS}}},insights.{}{{{INSIGHT_FIELDS}}}",
            date_clause(&filters.date)?
        );

        let mut params = vec![
            ("fields", fields),
            ("limit", self.config.page_size.to_string()),
            ("access_token", token.to_string()),
        ];
        if !filters.statuses.is_empty() {
            params.push(("effective_status", serde_json::to_string(&filters.statuses)?));
        }
        self.edge_url(account, "ads", &params)
    }

    pub(crate) fn trend_url(&self, account: &AccountRef, filters: &ReportFilters) -> ReportResult<Url> {
        let token = self.token(account)?;
        let mut params = vec![
            ("level", "account".to_string()),
            ("time_increment", "1".to_string()),
            ("fields", TREND_FIELDS.to_string()),
            ("limit", self.config.page_size.to_string()),
            ("access_token", token.to_string()),
        ];
        match &filters.date {
            DateSelection::Maximum => params.push(("date_preset", "maximum".to_string())),
            DateSelection::Preset { preset } => {
                params.push(("date_preset", checked_preset(preset)?.to_string()))
            }
            DateSelection::Range { since, until } => params.push((
                "time_range",
                serde_json::json!({ "since": since.to_string(), "until": until.to_string() }).to_string(),
            )),
        }
        self.edge_url(account, "insights", &params)
    }

    /// Fetch every page starting at `first`. Elements that do not decode are
    /// skipped; a page that does not decode fails the whole fetch.
    async fn fetch_all<T: DeserializeOwned>(&self, first: Url, what: &'static str) -> ReportResult<Vec<T>> {
        let mut records = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages >= self.config.max_pages {
                return Err(ReportError::Upstream(format!(
                    "{what} result exceeded {} pages",
                    self.config.max_pages
                )));
            }

            let page = self.get_page(url).await?;
            pages += 1;
            metrics::counter!("upstream.pages_fetched").increment(1);
            debug!(what, page = pages, items = page.data.len(), "Fetched Graph page");

            for item in page.data {
                match serde_json::from_value::<T>(item) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(what, error = %e, "Skipping malformed upstream record");
                        metrics::counter!("upstream.records_skipped").increment(1);
                    }
                }
            }

            next = match page.paging.and_then(|p| p.next) {
                Some(link) => Some(self.follow_cursor(&link)?),
                None => None,
            };
        }

        Ok(records)
    }

    /// Parse a `paging.next` link. The link carries the access token, so it
    /// is only followed when it stays on the configured Graph API origin.
    fn follow_cursor(&self, link: &str) -> ReportResult<Url> {
        let next = Url::parse(link)
            .map_err(|e| ReportError::Upstream(format!("invalid paging cursor: {e}")))?;
        let base = Url::parse(&self.config.graph_base_url)
            .map_err(|e| ReportError::Config(format!("invalid Graph API base url: {e}")))?;
        if !same_origin(&base, &next) {
            warn!(
                host = next.host_str().unwrap_or_default(),
                "Refusing paging cursor outside the Graph API host"
            );
            return Err(ReportError::Upstream(
                "paging cursor points outside the Graph API host".into(),
            ));
        }
        Ok(next)
    }

    async fn get_page(&self, url: Url) -> ReportResult<GraphPage> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e.without_url()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(e.without_url()))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ReportError::Upstream(format!("undecodable Graph API page: {e}")))
    }
}

#[async_trait]
impl InsightsSource for MetaGraphClient {
    fn name(&self) -> &'static str {
        "meta_graph"
    }

    async fn fetch_ad_records(
        &self,
        account: &AccountRef,
        filters: &ReportFilters,
    ) -> ReportResult<Vec<RawAdRecord>> {
        let url = self.ads_url(account, filters)?;
        let ads: Vec<RawAdRecord> = self.fetch_all(url, "ads").await?;
        debug!(account_id = %account.account_id, ads = ads.len(), "Fetched ad records");
        Ok(ads)
    }

    async fn fetch_account_trend(
        &self,
        account: &AccountRef,
        filters: &ReportFilters,
    ) -> ReportResult<Vec<RawDailyRecord>> {
        let url = self.trend_url(account, filters)?;
        let days: Vec<RawDailyRecord> = self.fetch_all(url, "trend").await?;
        debug!(account_id = %account.account_id, days = days.len(), "Fetched account trend");
        Ok(days)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Field-expansion date modifier for the nested insights block.
fn date_clause(date: &DateSelection) -> ReportResult<String> {
    Ok(match date {
        DateSelection::Maximum => "date_preset(maximum)".to_string(),
        DateSelection::Preset { preset } => format!("date_preset({})", checked_preset(preset)?),
        DateSelection::Range { since, until } => {
            format!("time_range({{\"since\":\"{since}\",\"until\":\"{until}\"}})")
        }
    })
}

/// Presets are spliced into field expansions, so only `[a-z0-9_]` passes.
fn checked_preset(preset: &str) -> ReportResult<&str> {
    let valid = !preset.is_empty()
        && preset
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(preset)
    } else {
        Err(ReportError::Validation(format!("unsupported date preset '{preset}'")))
    }
}

fn transport_error(e: reqwest::Error) -> ReportError {
    if e.is_timeout() {
        ReportError::Upstream("request to the ads platform timed out".into())
    } else {
        ReportError::Upstream(format!("could not reach the ads platform: {e}"))
    }
}

/// Map a non-2xx Graph response to the error taxonomy.
fn classify_failure(status: u16, body: &str) -> ReportError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(GraphErrorEnvelope { error }) => {
            let message = if error.message.is_empty() {
                format!("HTTP {status}")
            } else {
                error.message
            };
            match error.code {
                Some(INVALID_TOKEN_CODE) => ReportError::Unauthorized(message),
                Some(code) if RATE_LIMIT_CODES.contains(&code) => ReportError::RateLimited(message),
                _ => ReportError::Upstream(message),
            }
        }
        Err(_) => match status {
            401 | 403 => ReportError::Unauthorized(format!("HTTP {status}")),
            429 => ReportError::RateLimited(format!("HTTP {status}")),
            _ => ReportError::Upstream(format!("HTTP {status}")),
        },
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}
