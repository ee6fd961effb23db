//! Error types for Tootbot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TootbotError>;

#[derive(Error, Debug)]
pub enum TootbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TootbotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TootbotError::InvalidInput(_) => 3,
            TootbotError::Platform(PlatformError::Authentication(_)) => 2,
            TootbotError::Credential(_) => 2,
            TootbotError::Platform(_) => 1,
            TootbotError::Config(_) => 1,
            TootbotError::Database(_) => 1,
            TootbotError::Feed(_) => 1,
            TootbotError::Media(_) => 1,
        }
    }

    /// Whether this error only concerns the entry being processed.
    ///
    /// Entry-scoped errors skip the entry; everything else aborts the run.
    pub fn is_entry_scoped(&self) -> bool {
        match self {
            TootbotError::Media(_) => true,
            TootbotError::Platform(PlatformError::Authentication(_)) => false,
            TootbotError::Platform(_) => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(String),

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone)]
pub enum MediaError {
    #[error("Failed to fetch media: {0}")]
    Fetch(String),

    #[error("Failed to upload media: {0}")]
    Upload(String),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential file not found: {0}")]
    NotFound(String),

    #[error("Credential file is invalid: {0}")]
    Invalid(String),

    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = TootbotError::InvalidInput("--source is required".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let platform_error = PlatformError::Authentication("Invalid token".to_string());
        let error = TootbotError::Platform(platform_error);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_credential_error() {
        let error = TootbotError::Credential(CredentialError::NotFound(
            "data/mastodon.social.secret".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_feed_error() {
        let error = TootbotError::Feed(FeedError::Parse("unexpected EOF".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_database_error() {
        let db_error = DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        let error = TootbotError::Database(db_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = TootbotError::Platform(PlatformError::Posting("rejected".to_string()));
        assert_eq!(format!("{}", error), "Platform error: Posting failed: rejected");

        let error = TootbotError::Media(MediaError::Upload("413".to_string()));
        assert_eq!(format!("{}", error), "Media error: Failed to upload media: 413");

        let error = TootbotError::Feed(FeedError::Fetch("timeout".to_string()));
        assert_eq!(format!("{}", error), "Feed error: Failed to fetch feed: timeout");
    }

    #[test]
    fn test_entry_scoped_errors() {
        assert!(TootbotError::Media(MediaError::Fetch("404".to_string())).is_entry_scoped());
        assert!(TootbotError::Media(MediaError::Upload("500".to_string())).is_entry_scoped());
        assert!(
            TootbotError::Platform(PlatformError::Posting("422".to_string())).is_entry_scoped()
        );
        assert!(
            TootbotError::Platform(PlatformError::RateLimit("429".to_string())).is_entry_scoped()
        );
    }

    #[test]
    fn test_run_scoped_errors() {
        assert!(
            !TootbotError::Platform(PlatformError::Authentication("401".to_string()))
                .is_entry_scoped()
        );
        assert!(!TootbotError::Feed(FeedError::Fetch("dns".to_string())).is_entry_scoped());
        assert!(!TootbotError::Database(DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
        .is_entry_scoped());
    }

    #[test]
    fn test_error_conversion_from_feed_error() {
        let feed_error = FeedError::Parse("test".to_string());
        let error: TootbotError = feed_error.into();

        match error {
            TootbotError::Feed(_) => {}
            _ => panic!("Expected TootbotError::Feed"),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
