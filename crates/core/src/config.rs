use serde::Deserialize;

/// Access-token values shipped in sample env files; treated as "not configured".
const PLACEHOLDER_TOKENS: &[&str] = &["SEU_TOKEN_DE_ACESSO_AQUI", "SUA_CHAVE", "changeme"];

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADLENS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Marketing Graph API connection settings.
#[derive(Clone, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_kpi")]
    pub default_kpi: String,
    #[serde(default = "default_status_filter")]
    pub default_status_filter: Vec<String>,
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    3001
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_api_version() -> String {
    "v19.0".to_string()
}
fn default_page_size() -> u32 {
    50
}
fn default_max_pages() -> usize {
    200
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_kpi() -> String {
    "ROAS".to_string()
}
fn default_status_filter() -> Vec<String> {
    vec!["ACTIVE".to_string()]
}
fn default_unknown_label() -> String {
    "Unknown".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            graph_base_url: default_graph_base_url(),
            api_version: default_api_version(),
            access_token: None,
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl MetaConfig {
    /// The configured server-wide token, ignoring empty and placeholder values.
    pub fn usable_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !PLACEHOLDER_TOKENS.contains(t))
    }
}

impl std::fmt::Debug for MetaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaConfig")
            .field("graph_base_url", &self.graph_base_url)
            .field("api_version", &self.api_version)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_kpi: default_kpi(),
            default_status_filter: default_status_filter(),
            unknown_label: default_unknown_label(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            meta: MetaConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADLENS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("report.default_status_filter"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 3001);
        assert_eq!(config.meta.page_size, 50);
        assert_eq!(config.report.default_kpi, "ROAS");
        assert_eq!(config.report.default_status_filter, vec!["ACTIVE".to_string()]);
        assert_eq!(config.report.unknown_label, "Unknown");
    }

    #[test]
    fn test_placeholder_token_is_unusable() {
        let mut meta = MetaConfig::default();
        assert!(meta.usable_token().is_none());

        meta.access_token = Some("SEU_TOKEN_DE_ACESSO_AQUI".into());
        assert!(meta.usable_token().is_none());

        meta.access_token = Some("   ".into());
        assert!(meta.usable_token().is_none());

        meta.access_token = Some("EAAB-real".into());
        assert_eq!(meta.usable_token(), Some("EAAB-real"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let meta = MetaConfig {
            access_token: Some("EAAB-secret".into()),
            ..MetaConfig::default()
        };
        let rendered = format!("{meta:?}");
        assert!(!rendered.contains("EAAB-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
