use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u32,
};
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, ExamSettings, QuestionBankSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("OLYMPIAD_HOST", "0.0.0.0");
        let port = env_or_default("OLYMPIAD_PORT", "8000");

        let environment =
            parse_environment(env_optional("OLYMPIAD_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_optional("OLYMPIAD_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Olympiad Exam API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let admin_api_token = env_or_default("ADMIN_API_TOKEN", "");

        let total_questions =
            parse_u32("EXAM_TOTAL_QUESTIONS", env_or_default("EXAM_TOTAL_QUESTIONS", "5"))?;
        let question_time_limit_seconds = parse_u32(
            "EXAM_QUESTION_TIME_LIMIT_SECONDS",
            env_or_default("EXAM_QUESTION_TIME_LIMIT_SECONDS", "7"),
        )?;
        let countdown_duration_seconds = parse_u32(
            "EXAM_COUNTDOWN_SECONDS",
            env_or_default("EXAM_COUNTDOWN_SECONDS", "30"),
        )?;
        let disqualify_on_fullscreen_exit = env_optional("EXAM_DISQUALIFY_ON_FULLSCREEN_EXIT")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);

        let question_bank_path =
            env_or_default("QUESTION_BANK_PATH", "questions/question_bank.json");

        let log_level = env_or_default("OLYMPIAD_LOG_LEVEL", "info");
        let json = env_optional("OLYMPIAD_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            admin: AdminSettings { api_token: admin_api_token },
            exam: ExamSettings {
                total_questions,
                question_time_limit_seconds,
                countdown_duration_seconds,
                disqualify_on_fullscreen_exit,
            },
            question_bank: QuestionBankSettings { path: question_bank_path },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn question_bank(&self) -> &QuestionBankSettings {
        &self.question_bank
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.total_questions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_TOTAL_QUESTIONS",
                value: "0".to_string(),
            });
        }

        if self.exam.question_time_limit_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_QUESTION_TIME_LIMIT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(20..=300).contains(&self.exam.countdown_duration_seconds) {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_COUNTDOWN_SECONDS",
                value: self.exam.countdown_duration_seconds.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.admin.api_token.is_empty() {
            return Err(ConfigError::MissingSecret("ADMIN_API_TOKEN"));
        }

        let bank_path = std::path::Path::new(&self.question_bank.path);
        if !bank_path.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "QUESTION_BANK_PATH",
                value: self.question_bank.path.clone(),
            });
        }

        Ok(())
    }
}
