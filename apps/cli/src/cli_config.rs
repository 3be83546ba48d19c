use std::env;
use std::path::PathBuf;

use rbacsync_core::AppError;
use rbacsync_domain::Locale;
use tracing_subscriber::EnvFilter;

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub rbac_dir: PathBuf,
    pub definition_file: PathBuf,
    pub action_manifest: PathBuf,
    pub default_locale: Locale,
    pub source_locale: Locale,
    pub admin_user_id: String,
}

impl CliConfig {
    pub fn load() -> Result<Self, AppError> {
        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_env_u32("DATABASE_MAX_CONNECTIONS", 5)?;

        let rbac_dir = PathBuf::from(env::var("RBAC_DIR").unwrap_or_else(|_| "rbac".to_owned()));
        let definition_file = env::var("RBAC_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| rbac_dir.join("config.json"));
        let action_manifest = env::var("RBAC_ACTION_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|_| rbac_dir.join("actions.json"));

        let default_locale = language_env("APP_LANGUAGE")?;
        let source_locale = language_env("APP_SOURCE_LANGUAGE")?;

        let admin_user_id =
            env::var("RBAC_ADMIN_USER_ID").unwrap_or_else(|_| "admin".to_owned());
        if admin_user_id.trim().is_empty() {
            return Err(AppError::Validation(
                "RBAC_ADMIN_USER_ID must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            rbac_dir,
            definition_file,
            action_manifest,
            default_locale,
            source_locale,
            admin_user_id,
        })
    }

    /// Locales written by `export`: the default one and the source one.
    pub fn export_locales(&self) -> Vec<Locale> {
        if self.default_locale == self.source_locale {
            return vec![self.default_locale.clone()];
        }

        vec![self.default_locale.clone(), self.source_locale.clone()]
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn language_env(name: &str) -> Result<Locale, AppError> {
    let language = env::var(name).unwrap_or_else(|_| "en-US".to_owned());
    Locale::from_language(language.as_str())
        .map_err(|error| AppError::Validation(format!("invalid {name} value '{language}': {error}")))
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
