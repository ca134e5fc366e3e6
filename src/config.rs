use thiserror::Error;

/// Startup-fatal configuration problems. The process must not start with an
/// incomplete config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Everything the process needs, loaded once at startup. Immutable after
/// that.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub broadcaster_id: String,
    pub channel_name: String,
    pub spreadsheet_id: String,
    pub google_credentials_file: String,
    /// Display names whose links get logged even without the moderator
    /// badge. Comma-separated in AUTHORIZED_USERS; may be empty.
    pub authorized_users: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require("CLIENT_ID")?,
            client_secret: require("SECRET")?,
            broadcaster_id: require("BROADCASTER_ID")?,
            channel_name: require("CHANNEL_NAME")?,
            spreadsheet_id: require("SPREADSHEET_ID")?,
            google_credentials_file: require("GOOGLE_CREDENTIALS_FILE")?,
            authorized_users: std::env::var("AUTHORIZED_USERS")
                .map(|raw| parse_user_list(&raw))
                .unwrap_or_default(),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parse_user_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_list_splits_and_trims() {
        assert_eq!(
            parse_user_list("MLH, other_user ,third"),
            vec!["MLH", "other_user", "third"]
        );
    }

    #[test]
    fn empty_user_list_yields_no_names() {
        assert!(parse_user_list("").is_empty());
        assert!(parse_user_list(" , ,").is_empty());
    }

    #[test]
    fn missing_var_error_names_the_variable() {
        let err = ConfigError::MissingVar("CLIENT_ID");
        assert_eq!(
            err.to_string(),
            "missing required environment variable CLIENT_ID"
        );
    }
}
