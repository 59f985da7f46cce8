use crate::error::{ReportError, ReportResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

// ─── Upstream records ───────────────────────────────────────────────────────
//
// Shapes returned by the ads platform. Every field is optional and numeric
// fields stay as raw JSON values; the normalizer owns the parse-or-zero pass.

/// One ad as returned by the ads edge, with its insight block expanded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAdRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub effective_status: Option<String>,
    #[serde(default)]
    pub campaign: Option<RawEntityRef>,
    #[serde(default)]
    pub adset: Option<RawEntityRef>,
    #[serde(default)]
    pub creative: Option<RawCreative>,
    #[serde(default)]
    pub insights: Option<RawInsightsEnvelope>,
}

impl RawAdRecord {
    /// The insight row for the requested period, if the platform returned one.
    pub fn insight(&self) -> Option<&RawInsight> {
        self.insights.as_ref().and_then(|env| env.data.first())
    }
}

/// Campaign or ad set reference embedded in an ad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInsightsEnvelope {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<RawInsight>,
}

/// A single insight row. Used both for the per-ad lifetime block and for the
/// account-level daily rows of the trend query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInsight {
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub date_stop: Option<String>,
    #[serde(default)]
    pub spend: Option<Value>,
    #[serde(default)]
    pub clicks: Option<Value>,
    #[serde(default)]
    pub inline_link_clicks: Option<Value>,
    #[serde(default)]
    pub impressions: Option<Value>,
    #[serde(default)]
    pub reach: Option<Value>,
    #[serde(default)]
    pub cpm: Option<Value>,
    #[serde(default)]
    pub ctr: Option<Value>,
    #[serde(default)]
    pub inline_link_click_ctr: Option<Value>,
    #[serde(default)]
    pub frequency: Option<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub purchase_roas: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub actions: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub action_values: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub video_p25_watched_actions: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub video_p50_watched_actions: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub video_p75_watched_actions: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub video_p95_watched_actions: Vec<RawActionValue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub video_p100_watched_actions: Vec<RawActionValue>,
}

/// Account-level daily row of the trend query.
pub type RawDailyRecord = RawInsight;

/// Typed `{action_type, value}` pair used by actions, action values, ROAS and
/// video watch lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawActionValue {
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl RawActionValue {
    pub fn new(action_type: &str, value: impl Into<Value>) -> Self {
        Self {
            action_type: action_type.to_string(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCreative {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub object_story_spec: Option<RawStorySpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStorySpec {
    #[serde(default)]
    pub link_data: Option<RawLinkData>,
    #[serde(default)]
    pub video_data: Option<RawVideoData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLinkData {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVideoData {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

/// Accepts an array, `null`, or any other junk (treated as empty). Array
/// elements that do not decode are logged, counted and dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let (records, skipped) = decode_elements(value);
    if skipped > 0 {
        warn!(skipped, "Skipping malformed nested upstream entries");
        metrics::counter!("upstream.records_skipped").increment(skipped as u64);
    }
    Ok(records)
}

/// Decoded elements plus the number that failed to decode. Non-arrays are
/// empty with nothing skipped.
fn decode_elements<T: serde::de::DeserializeOwned>(value: Value) -> (Vec<T>, usize) {
    let Value::Array(items) = value else {
        return (Vec::new(), 0);
    };
    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    let skipped = total - records.len();
    (records, skipped)
}

// ─── Filters ────────────────────────────────────────────────────────────────

/// Reporting period requested from the ads platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSelection {
    /// Lifetime of the account (`date_preset=maximum`).
    #[default]
    Maximum,
    Preset { preset: String },
    Range { since: NaiveDate, until: NaiveDate },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    pub date: DateSelection,
    /// Effective-status values to keep; empty means no status filter.
    #[serde(default)]
    pub statuses: Vec<String>,
}

impl ReportFilters {
    /// Build filters from loose request inputs. A date range needs both ends
    /// and cannot be combined with a preset.
    pub fn from_parts(
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
        preset: Option<&str>,
        statuses: Vec<String>,
    ) -> ReportResult<Self> {
        let preset = preset.map(str::trim).filter(|p| !p.is_empty());
        let date = match (since, until, preset) {
            (None, None, None) => DateSelection::Maximum,
            (None, None, Some(p)) => DateSelection::Preset {
                preset: p.to_ascii_lowercase(),
            },
            (Some(since), Some(until), None) => {
                if since > until {
                    return Err(ReportError::Validation(format!(
                        "date range start {since} is after end {until}"
                    )));
                }
                DateSelection::Range { since, until }
            }
            (Some(_), Some(_), Some(_)) => {
                return Err(ReportError::Validation(
                    "use either a date range or a date preset, not both".into(),
                ))
            }
            _ => {
                return Err(ReportError::Validation(
                    "a date range needs both 'since' and 'until'".into(),
                ))
            }
        };

        let statuses = statuses
            .into_iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self { date, statuses })
    }
}

// ─── Accounts and report definitions ────────────────────────────────────────

/// Normalize an ad account id to the `act_<digits>` form.
pub fn normalize_account_id(raw: &str) -> ReportResult<String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("act_").unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReportError::Validation(format!(
            "'{trimmed}' is not a valid ad account id"
        )));
    }
    Ok(format!("act_{digits}"))
}

/// The account a report is computed for, plus the credential to use.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub account_id: String,
    pub access_token: Option<String>,
}

impl AccountRef {
    pub fn new(raw_account_id: &str, access_token: Option<String>) -> ReportResult<Self> {
        Ok(Self {
            account_id: normalize_account_id(raw_account_id)?,
            access_token,
        })
    }
}

impl std::fmt::Debug for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRef")
            .field("account_id", &self.account_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A saved report: which client, which account, which KPI ranks the ads.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub id: Uuid,
    pub client_name: String,
    pub ad_account_id: String,
    pub kpi: String,
    /// Opaque per-report credential. Write-only.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportDefinition {
    pub fn account(&self) -> ReportResult<AccountRef> {
        AccountRef::new(&self.ad_account_id, self.access_token.clone())
    }
}

impl std::fmt::Debug for ReportDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDefinition")
            .field("id", &self.id)
            .field("client_name", &self.client_name)
            .field("ad_account_id", &self.ad_account_id)
            .field("kpi", &self.kpi)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
