//! In-memory registry of report definitions. Lives for the process only.

use adlens_core::types::{normalize_account_id, ReportDefinition};
use adlens_core::{ReportError, ReportResult};
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

/// Maximum length of free-text fields (client name, KPI).
const MAX_FIELD_LEN: usize = 256;

/// Body of `POST /api/reports`.
#[derive(Clone, Deserialize)]
pub struct NewReportDefinition {
    pub client_name: String,
    pub ad_account_id: String,
    #[serde(default)]
    pub kpi: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for NewReportDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewReportDefinition")
            .field("client_name", &self.client_name)
            .field("ad_account_id", &self.ad_account_id)
            .field("kpi", &self.kpi)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub struct ReportRegistry {
    definitions: DashMap<Uuid, ReportDefinition>,
    default_kpi: String,
}

impl ReportRegistry {
    pub fn new(default_kpi: impl Into<String>) -> Self {
        Self {
            definitions: DashMap::new(),
            default_kpi: default_kpi.into(),
        }
    }

    pub fn create(&self, request: NewReportDefinition) -> ReportResult<ReportDefinition> {
        let client_name = request.client_name.trim();
        if client_name.is_empty() {
            return Err(ReportError::Validation("'client_name' must not be empty".into()));
        }
        if client_name.len() > MAX_FIELD_LEN {
            return Err(ReportError::Validation("'client_name' exceeds maximum length".into()));
        }

        let ad_account_id = normalize_account_id(&request.ad_account_id)?;

        let kpi = request
            .kpi
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.default_kpi.as_str());
        if kpi.len() > MAX_FIELD_LEN {
            return Err(ReportError::Validation("'kpi' exceeds maximum length".into()));
        }

        let now = Utc::now();
        let definition = ReportDefinition {
            id: Uuid::new_v4(),
            client_name: client_name.to_string(),
            ad_account_id,
            kpi: kpi.to_string(),
            access_token: request
                .access_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            created_at: now,
            updated_at: now,
        };

        self.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    pub fn get(&self, id: &Uuid) -> ReportResult<ReportDefinition> {
        self.definitions
            .get(id)
            .map(|d| d.value().clone())
            .ok_or_else(|| ReportError::NotFound(format!("report {id} not found")))
    }

    /// All definitions, newest first.
    pub fn list(&self) -> Vec<ReportDefinition> {
        let mut all: Vec<ReportDefinition> =
            self.definitions.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn delete(&self, id: &Uuid) -> ReportResult<()> {
        self.definitions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ReportError::NotFound(format!("report {id} not found")))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
