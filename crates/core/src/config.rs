use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// HS256 secret used to verify bearer tokens issued by the auth provider.
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub postgres_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotaConfig {
    #[serde(default = "default_free_limit")]
    pub free_limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_max_redirect_hops")]
    pub max_redirect_hops: usize,
    /// Loopback and RFC 1918 targets are refused unless this is set.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_html_chars")]
    pub max_html_chars: usize,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailboxConfig {
    #[serde(default = "default_mailbox_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_fallback_domain")]
    pub fallback_domain: String,
    #[serde(default = "default_mailbox_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CryptoConfig {
    #[serde(default = "default_key_id")]
    pub key_id: String,
    /// Base64 encoded 32-byte key.
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_repeat_delay")]
    pub repeat_delay_seconds: u64,
}

impl AppConfig {
    /// Environment variables win over the file so secrets never need to live in it.
    pub fn apply_env_overrides(&mut self) {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("DATABASE_URL") {
            self.database.postgres_url = v;
        }
        if let Some(v) = non_empty("TABRELAY_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = non_empty("TABRELAY_JWT_SECRET") {
            self.server.jwt_secret = v;
        }
        if let Some(v) = non_empty("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some(v) = non_empty("AI_ENDPOINT") {
            self.ai.endpoint = v;
        }
        if let Some(v) = non_empty("CREDENTIAL_KEY") {
            self.crypto.key = v;
        }
        if let Some(v) = non_empty("CREDENTIAL_KEY_ID") {
            self.crypto.key_id = v;
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            jwt_secret: String::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { free_limit: default_free_limit() }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            max_body_size: default_max_body_size(),
            max_redirect_hops: default_max_redirect_hops(),
            allow_private_hosts: false,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            api_key: String::new(),
            temperature: default_ai_temperature(),
            timeout_seconds: default_ai_timeout(),
            max_html_chars: default_max_html_chars(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mailbox_endpoint(),
            fallback_domain: default_fallback_domain(),
            timeout_seconds: default_mailbox_timeout(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_id: default_key_id(),
            key: String::new(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { repeat_delay_seconds: default_repeat_delay() }
    }
}

fn default_bind() -> String { "0.0.0.0:8080".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_free_limit() -> u32 { 3 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_connect_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_body_size() -> usize { 5 * 1024 * 1024 }
fn default_max_redirect_hops() -> usize { 5 }
fn default_ai_endpoint() -> String { "https://ai.gateway.lovable.dev/v1/chat/completions".to_string() }
fn default_ai_model() -> String { "google/gemini-2.5-flash".to_string() }
fn default_ai_temperature() -> f32 { 0.3 }
fn default_ai_timeout() -> u64 { 60 }
fn default_max_html_chars() -> usize { 50_000 }
fn default_confidence_threshold() -> u8 { 50 }
fn default_mailbox_endpoint() -> String {
    "https://www.1secmail.com/api/v1/?action=genRandomMailbox&count=1".to_string()
}
fn default_fallback_domain() -> String { "tempmailgen.com".to_string() }
fn default_mailbox_timeout() -> u64 { 5 }
fn default_key_id() -> String { "v1".to_string() }
fn default_repeat_delay() -> u64 { 2 }
