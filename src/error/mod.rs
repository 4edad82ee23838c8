mod codes;

pub use codes::ExitCode;

use crate::api::ApiError;
use crate::artifacts::ArtifactError;
use crate::config::ConfigError;
use crate::scanner::ScannerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Source directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog client error: {message}")]
    ApiError { message: String },

    #[error("Cover downloader error: {message}")]
    CoverClient { message: String },

    #[error("Log file error: {path}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} videos failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::DirectoryNotFound { .. } => ExitCode::DirectoryNotFound,
            AppError::NotADirectory { .. } => ExitCode::DirectoryNotFound,
            AppError::Config(_) => ExitCode::ConfigError,
            AppError::ApiError { .. } => ExitCode::ApiError,
            AppError::CoverClient { .. } => ExitCode::GeneralError,
            AppError::LogFile { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ExitCode::PermissionError
            }
            AppError::LogFile { .. } => ExitCode::GeneralError,
            AppError::PartialFailure { .. } => ExitCode::PartialFailure,
            AppError::Other(_) => ExitCode::GeneralError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::DirectoryNotFound { path } => {
                format!(
                    "The source directory does not exist:\n  {}\n\n\
                     Check base.source_dir in the config file, the\n\
                     JAVDB2FOLDER_SOURCE_DIR variable or the --source flag.",
                    path.display()
                )
            }

            AppError::NotADirectory { path } => {
                format!(
                    "The source path is not a directory:\n  {}\n\n\
                     Please provide a valid directory path.",
                    path.display()
                )
            }

            AppError::Config(err) => match err {
                ConfigError::NotFound(path) => format!(
                    "The config file does not exist:\n  {}\n\n\
                     Omit --config to use config/config.yml or built-in defaults.",
                    path.display()
                ),
                ConfigError::Parse { path, message } => format!(
                    "The config file could not be parsed:\n  {}\n  {}\n\n\
                     Check the YAML syntax and field names.",
                    path.display(),
                    message
                ),
                other => format!("{}", other),
            },

            AppError::ApiError { message } => {
                format!(
                    "Failed to set up the catalog client:\n  {}\n\n\
                     Check scraper.javdb in the config file and the cookie file.",
                    message
                )
            }

            AppError::CoverClient { message } => {
                format!(
                    "Failed to set up the cover downloader:\n  {}\n\n\
                     Check scraper.javdb.user_agent and scraper.javdb.image_timeout_ms.",
                    message
                )
            }

            AppError::LogFile { path, source } => {
                format!(
                    "Failed to open the log file:\n  {}\n  {}\n\n\
                     Check logging.path or disable file logging.",
                    path.display(),
                    source
                )
            }

            AppError::PartialFailure { failed, total } => {
                format!(
                    "{} of {} videos could not be organized.\n\
                     Run with -v to see why each attempt failed.",
                    failed, total
                )
            }

            AppError::Other(message) => message.clone(),
        }
    }
}

impl From<ScannerError> for AppError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::PathNotFound(path) => AppError::DirectoryNotFound { path },
            ScannerError::NotADirectory(path) => AppError::NotADirectory { path },
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::ApiError {
            message: err.to_string(),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        AppError::CoverClient {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err = AppError::DirectoryNotFound {
            path: PathBuf::from("/test"),
        };
        assert_eq!(err.exit_code(), ExitCode::DirectoryNotFound);

        let err = AppError::PartialFailure { failed: 1, total: 3 };
        assert_eq!(err.exit_code(), ExitCode::PartialFailure);

        let err = AppError::Config(ConfigError::Invalid("bad".to_string()));
        assert_eq!(err.exit_code(), ExitCode::ConfigError);

        let err = AppError::LogFile {
            path: PathBuf::from("/var/log/x.log"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.exit_code(), ExitCode::PermissionError);
    }

    #[test]
    fn test_detailed_message_includes_context() {
        let err = AppError::Config(ConfigError::NotFound(PathBuf::from("custom.yml")));

        let msg = err.detailed_message();
        assert!(msg.contains("custom.yml"));
        assert!(msg.contains("--config"));
    }

    #[test]
    fn test_scanner_error_conversion() {
        let app_err: AppError = ScannerError::PathNotFound(PathBuf::from("/missing")).into();
        assert_eq!(app_err.exit_code(), ExitCode::DirectoryNotFound);

        let app_err: AppError = ScannerError::NotADirectory(PathBuf::from("/file")).into();
        assert_eq!(app_err.exit_code(), ExitCode::DirectoryNotFound);
    }

    #[test]
    fn test_api_error_conversion() {
        let app_err: AppError = ApiError::ParseError("bad cookie".to_string()).into();
        assert_eq!(app_err.exit_code(), ExitCode::ApiError);
        assert!(app_err.detailed_message().contains("bad cookie"));
    }

    #[test]
    fn test_artifact_error_conversion() {
        let app_err: AppError = ArtifactError::Download("tls backend missing".to_string()).into();
        assert!(matches!(app_err, AppError::CoverClient { .. }));
        assert_eq!(app_err.exit_code(), ExitCode::GeneralError);

        let msg = app_err.detailed_message();
        assert!(msg.contains("cover downloader"));
        assert!(msg.contains("tls backend missing"));
        assert!(!msg.contains("catalog client"));
    }
}
