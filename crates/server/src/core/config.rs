//! Server configuration
//!
//! Everything is read from the environment once at startup (`.env` is
//! loaded by `main`). Optional integrations stay `None` when their
//! settings are incomplete and the matching endpoint answers
//! `ServiceNotConfigured`.

use chrono::Duration as TokenTtl;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::chat::context::ProfileFacts;
use crate::chat::provider::{CompletionProvider, LlmSettings, OpenAiProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::chat::ChatRelay;
use crate::contact::mailer::{Mailer, SmtpMailer, SmtpSettings};
use crate::contact::ContactRelay;
use crate::core::auth::token::TokenService;
use crate::core::auth::AuthManager;
use crate::core::cors::OriginPolicy;
use crate::core::db::Database;
use crate::core::router::API_ROUTES;
use crate::projects::ProjectStore;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://portfolio.sqlite";
pub const DEFAULT_SMTP_HOST: &str = "smtp-relay.brevo.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_NAME: &str = "Portfolio Contact Form";

/// Credentials for the admin account created at startup.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Adds internal error detail to error responses.
    pub development: bool,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl: TokenTtl,
    pub cookie_secure: bool,
    pub allow_registration: bool,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminBootstrap>,
    pub cors: OriginPolicy,
    pub smtp: Option<SmtpSettings>,
    pub llm: Option<LlmSettings>,
    pub profile_name: String,
    pub contact_email: Option<String>,
    pub upstream_timeout: Duration,
}

impl ServerConfig {
    /// Defaults suitable for tests and local runs: no SMTP, no LLM.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            development: false,
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_ttl: TokenTtl::hours(24),
            cookie_secure: false,
            allow_registration: true,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin: None,
            cors: OriginPolicy::default(),
            smtp: None,
            llm: None,
            profile_name: "Portfolio Owner".to_string(),
            contact_email: None,
            upstream_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Self {
        let jwt_secret = match env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("[Config] JWT_SECRET not set, using a random secret; sessions will not survive a restart");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };

        let database_url = var_or("DATABASE_URL", DEFAULT_DATABASE_URL);
        let mut config = Self::new(database_url, jwt_secret);

        config.port = parse_var("PORT").unwrap_or(DEFAULT_PORT);
        config.development = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);
        config.jwt_ttl = TokenTtl::hours(parse_var("JWT_EXPIRES_HOURS").unwrap_or(24));
        config.cookie_secure = flag("COOKIE_SECURE", false);
        config.allow_registration = flag("ALLOW_REGISTRATION", true);
        config.bcrypt_cost = parse_var("BCRYPT_COST").unwrap_or(bcrypt::DEFAULT_COST);
        config.upstream_timeout = Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS").unwrap_or(30));
        config.cors = OriginPolicy::parse(&var_or("FRONTEND_URL", ""));
        config.profile_name = var_or("PROFILE_NAME", "Portfolio Owner");

        config.admin = match (opt_var("ADMIN_EMAIL"), opt_var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: var_or("ADMIN_NAME", "Admin"),
                email,
                password,
            }),
            _ => None,
        };

        let from_email = opt_var("FROM_EMAIL");
        let to_email = opt_var("TO_EMAIL").or_else(|| from_email.clone());
        config.contact_email = from_email.clone().or_else(|| to_email.clone());

        config.smtp = match (opt_var("SMTP_USER"), opt_var("SMTP_PASS"), from_email, to_email) {
            (Some(username), Some(password), Some(from_email), Some(to_email)) => Some(SmtpSettings {
                host: var_or("SMTP_HOST", DEFAULT_SMTP_HOST),
                port: parse_var("SMTP_PORT").unwrap_or(DEFAULT_SMTP_PORT),
                username,
                password,
                from_email,
                from_name: var_or("FROM_NAME", DEFAULT_FROM_NAME),
                to_email,
                bcc_self: flag("SMTP_BCC_SELF", false),
                timeout: config.upstream_timeout,
            }),
            _ => None,
        };

        config.llm = opt_var("OPENAI_API_KEY").map(|api_key| LlmSettings {
            api_key,
            base_url: var_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: var_or("OPENAI_MODEL", DEFAULT_MODEL),
            temperature: 0.7,
            timeout: config.upstream_timeout,
        });

        config
    }
}

fn opt_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    opt_var(key).unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = opt_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("[Config] Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}

fn flag(key: &str, default: bool) -> bool {
    opt_var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Arc<Database>,
    pub auth: Arc<AuthManager>,
    pub projects: Arc<ProjectStore>,
    pub contact: Arc<ContactRelay>,
    pub chat: Arc<ChatRelay>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with explicit outbound clients. `None` disables the
    /// matching endpoint.
    pub async fn new(
        config: ServerConfig,
        mailer: Option<Arc<dyn Mailer>>,
        provider: Option<Arc<dyn CompletionProvider>>,
    ) -> anyhow::Result<Self> {
        let db = Arc::new(Database::new(config.database_url.clone()));
        let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.jwt_ttl);
        let auth = Arc::new(AuthManager::new(db.clone(), tokens, config.bcrypt_cost).await?);
        let projects = Arc::new(ProjectStore::new(db.clone()));

        let contact = Arc::new(ContactRelay::new(mailer, config.upstream_timeout));
        let profile = ProfileFacts {
            name: config.profile_name.clone(),
            email: config.contact_email.clone(),
            stack: "Rust API server (axum, tokio, SQLite via sqlx)".to_string(),
            routes: API_ROUTES.iter().map(|r| r.to_string()).collect(),
        };
        let chat = Arc::new(ChatRelay::new(provider, profile, config.upstream_timeout));

        Ok(Self {
            config: Arc::new(config),
            db,
            auth,
            projects,
            contact,
            chat,
            started_at: Instant::now(),
        })
    }

    /// Build state with the production SMTP and LLM clients.
    pub async fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
            Some(settings) => {
                info!("[Config] SMTP relay via {}:{}", settings.host, settings.port);
                Some(Arc::new(SmtpMailer::new(settings)?))
            }
            None => {
                warn!("[Config] SMTP not configured; /contact is disabled");
                None
            }
        };

        let provider: Option<Arc<dyn CompletionProvider>> = match &config.llm {
            Some(settings) => Some(Arc::new(OpenAiProvider::new(settings.clone())?)),
            None => {
                warn!("[Config] OPENAI_API_KEY not set; /chat is disabled");
                None
            }
        };

        Self::new(config, mailer, provider).await
    }
}
