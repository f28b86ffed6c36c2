use std::fmt;

use remote::Credentials;

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub(crate) const DEFAULT_TOTAL_SECONDS: u32 = 600;
pub(crate) const DEFAULT_LOG: &str = "warn";

#[derive(Debug)]
pub(crate) struct InvalidSetting {
    pub key: &'static str,
    pub raw: String,
}

impl fmt::Display for InvalidSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {}", self.key, self.raw)
    }
}

impl std::error::Error for InvalidSetting {}

/// Settings shared by every subcommand.
///
/// Read from `QUIZ_*` environment variables (after `.env` is loaded);
/// command-line flags override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub base_url: String,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub total_seconds: u32,
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            access_token: None,
            username: None,
            password: None,
            total_seconds: DEFAULT_TOTAL_SECONDS,
            log: DEFAULT_LOG.to_owned(),
        }
    }
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self, InvalidSetting> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, InvalidSetting> {
        let mut settings = Self::default();
        if let Some(url) = lookup("QUIZ_BASE_URL").filter(|v| !v.trim().is_empty()) {
            settings.base_url = url;
        }
        settings.access_token = lookup("QUIZ_TOKEN").filter(|v| !v.trim().is_empty());
        settings.username = lookup("QUIZ_USERNAME").filter(|v| !v.trim().is_empty());
        settings.password = lookup("QUIZ_PASSWORD").filter(|v| !v.is_empty());
        if let Some(raw) = lookup("QUIZ_TOTAL_SECONDS") {
            settings.total_seconds = parse_seconds("QUIZ_TOTAL_SECONDS", raw)?;
        }
        if let Some(log) = lookup("QUIZ_LOG").filter(|v| !v.trim().is_empty()) {
            settings.log = log;
        }
        Ok(settings)
    }

    /// Username and password, when both are configured.
    pub(crate) fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        }
    }
}

pub(crate) fn parse_seconds(key: &'static str, raw: String) -> Result<u32, InvalidSetting> {
    match raw.trim().parse::<u32>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(InvalidSetting { key, raw }),
    }
}
