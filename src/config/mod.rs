use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub content: ContentConfig,
    pub security: SecurityConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub max_post_chars: usize,
    pub max_message_chars: usize,
    pub max_bio_chars: usize,
    pub max_report_reason_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub allow_registration: bool,
}

/// Report-count cutoffs for automatic content actions. Reaching
/// `auto_review_threshold` reports flags the post for manual review;
/// reaching `auto_remove_threshold` takes it down outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub auto_review_threshold: i64,
    pub auto_remove_threshold: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs =
                v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_REGISTRATION") {
            self.security.allow_registration = v.parse().unwrap_or(self.security.allow_registration);
        }

        // Moderation overrides
        if let Ok(v) = env::var("MODERATION_REVIEW_THRESHOLD") {
            self.moderation.auto_review_threshold =
                v.parse().unwrap_or(self.moderation.auto_review_threshold);
        }
        if let Ok(v) = env::var("MODERATION_REMOVE_THRESHOLD") {
            self.moderation.auto_remove_threshold =
                v.parse().unwrap_or(self.moderation.auto_remove_threshold);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
            content: ContentConfig {
                max_post_chars: 5000,
                max_message_chars: 5000,
                max_bio_chars: 500,
                max_report_reason_chars: 1000,
            },
            security: SecurityConfig {
                // Local-only fallback; real deployments set JWT_SECRET
                jwt_secret: "roost-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                allow_registration: true,
            },
            moderation: ModerationConfig {
                auto_review_threshold: 5,
                auto_remove_threshold: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 50,
            },
            content: ContentConfig {
                max_post_chars: 5000,
                max_message_chars: 5000,
                max_bio_chars: 500,
                max_report_reason_chars: 1000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                allow_registration: true,
            },
            moderation: ModerationConfig {
                auto_review_threshold: 5,
                auto_remove_threshold: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 50,
            },
            content: ContentConfig {
                max_post_chars: 5000,
                max_message_chars: 5000,
                max_bio_chars: 500,
                max_report_reason_chars: 1000,
            },
            security: SecurityConfig {
                // Must be provided via JWT_SECRET; auth refuses an empty secret
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                allow_registration: true,
            },
            moderation: ModerationConfig {
                auto_review_threshold: 5,
                auto_remove_threshold: 10,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.moderation.auto_review_threshold, 5);
        assert_eq!(config.moderation.auto_remove_threshold, 10);
        assert!(config.security.allow_registration);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn production_requires_explicit_secret() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.api.max_page_size, 50);
    }

    #[test]
    fn moderation_thresholds_come_from_env() {
        std::env::set_var("MODERATION_REMOVE_THRESHOLD", "3");
        let config = AppConfig::development().with_env_overrides();
        assert_eq!(config.moderation.auto_remove_threshold, 3);
        std::env::remove_var("MODERATION_REMOVE_THRESHOLD");
    }
}
