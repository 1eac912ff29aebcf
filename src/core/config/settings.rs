use super::parsing::{
    env_flag, env_optional, env_or_default, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, AuthSettings, ConfigError, CorsSettings, DatabaseSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("SURVEY_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("SURVEY_STRICT_CONFIG", false) || environment.is_production();

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None if strict_config => return Err(ConfigError::MissingSecret("SECRET_KEY")),
            None => load_or_create_secret_key(),
        };

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(env_or_default("SURVEY_HOST", "0.0.0.0"))?,
                port: ServerPort::parse(env_or_default("SURVEY_PORT", "4000"))?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                project_name: env_or_default("PROJECT_NAME", "School Survey API"),
                version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
                graphql_path: env_or_default("GRAPHQL_PATH", "/graphql"),
                playground_enabled: env_flag("GRAPHQL_PLAYGROUND", !environment.is_production()),
            },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes: parse_u64(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "60"),
                )?,
                refresh_token_expire_days: parse_u64(
                    "REFRESH_TOKEN_EXPIRE_DAYS",
                    env_or_default("REFRESH_TOKEN_EXPIRE_DAYS", "30"),
                )?,
                algorithm: env_or_default("ALGORITHM", "HS256"),
            },
            cors: CorsSettings { origins: parse_cors_origins(env_optional("CORS_ORIGINS"))? },
            database: DatabaseSettings {
                postgres_server: env_or_default("POSTGRES_SERVER", "localhost"),
                postgres_port: parse_u16(
                    "POSTGRES_PORT",
                    env_or_default("POSTGRES_PORT", "5432"),
                )?,
                postgres_user: env_or_default("POSTGRES_USER", "survey"),
                postgres_password: env_or_default("POSTGRES_PASSWORD", ""),
                postgres_db: env_or_default("POSTGRES_DB", "survey_db"),
                database_url: env_optional("DATABASE_URL"),
                max_connections: parse_u32(
                    "DATABASE_MAX_CONNECTIONS",
                    env_or_default("DATABASE_MAX_CONNECTIONS", "20"),
                )?,
            },
            redis: RedisSettings {
                host: env_or_default("REDIS_HOST", "localhost"),
                port: parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?,
                db: parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?,
                password: env_or_default("REDIS_PASSWORD", ""),
            },
            admin: AdminSettings {
                first_admin_email: env_or_default("FIRST_ADMIN_EMAIL", "admin@example.com"),
                first_admin_password: env_or_default("FIRST_ADMIN_PASSWORD", ""),
            },
            auth: AuthSettings {
                login_attempts_per_window: parse_u64(
                    "LOGIN_RATE_LIMIT",
                    env_or_default("LOGIN_RATE_LIMIT", "10"),
                )?,
                login_window_seconds: parse_u64(
                    "LOGIN_RATE_WINDOW_SECONDS",
                    env_or_default("LOGIN_RATE_WINDOW_SECONDS", "60"),
                )?,
            },
            telemetry: TelemetrySettings {
                log_level: env_or_default("SURVEY_LOG_LEVEL", "info"),
                json: env_flag("SURVEY_LOG_JSON", false),
                prometheus_enabled: env_flag("PROMETHEUS_ENABLED", false),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn auth(&self) -> &AuthSettings {
        &self.auth
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.graphql_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "GRAPHQL_PATH",
                value: self.api.graphql_path.clone(),
            });
        }

        if self.security.access_token_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.auth.login_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "LOGIN_RATE_WINDOW_SECONDS",
                value: "0".to_string(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::core::config::ConfigError;
    use crate::test_support;

    #[tokio::test]
    async fn defaults_load_outside_strict_mode() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().graphql_path, "/graphql");
        assert_eq!(settings.security().secret_key, test_support::TEST_SECRET_KEY);
        assert!(!settings.telemetry().prometheus_enabled);
    }

    #[tokio::test]
    async fn strict_mode_requires_admin_password() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("SURVEY_STRICT_CONFIG", "1");
        std::env::remove_var("FIRST_ADMIN_PASSWORD");

        let result = Settings::load();
        std::env::set_var("SURVEY_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"))));
    }

    #[tokio::test]
    async fn graphql_path_must_be_absolute() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("GRAPHQL_PATH", "graphql");

        let result = Settings::load();
        std::env::remove_var("GRAPHQL_PATH");

        assert!(matches!(result, Err(ConfigError::InvalidValue { field: "GRAPHQL_PATH", .. })));
    }
}
