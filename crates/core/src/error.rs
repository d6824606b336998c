//! Core error type
//!
//! Every error carries a stable numeric code (displayed as `E####`), the
//! steps that were being taken when it happened, and optionally a hint for
//! the user.

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error codes for programmatic error handling
///
/// The thousands digit is the category: 2 for IO, 3 for configuration,
/// 4 for JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Reading or writing a file failed
    Io = 2000,
    /// A file does not exist
    FileNotFound = 2001,
    /// Access to a file was refused
    PermissionDenied = 2002,
    /// A configuration file that was asked for explicitly is missing
    ConfigNotFound = 3001,
    /// A configuration file is not valid TOML or does not fit the schema
    ConfigParse = 3002,
    /// A configuration value is out of range or inconsistent
    ConfigInvalid = 3003,
    /// A value could not be converted to or from JSON
    Json = 4000,
}

impl ErrorCode {
    /// Get the numeric code
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the code belongs to the configuration category
    #[must_use]
    pub fn is_config(self) -> bool {
        self.code() / 1000 == 3
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Error with a code, context trail, and optional hint
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// What was being done, outermost step last
    pub context: Vec<String>,
    /// What the user can do about it
    pub hint: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        for step in &self.context {
            write!(f, "\n  while: {step}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
            hint: None,
            source: None,
        }
    }

    /// Record what was being done when the error happened
    #[must_use]
    pub fn context(mut self, step: impl Into<String>) -> Self {
        self.context.push(step.into());
        self
    }

    /// Attach a hint for the user
    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn caused_by(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Configuration file was requested explicitly but does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("configuration file not found: {}", path.display()),
        )
        .hint("create .partnersell.toml or pass an existing path")
    }

    /// Configuration value failed validation
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::Io,
        };
        Error::new(code, err.to_string()).caused_by(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::Json, err.to_string()).caused_by(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParse, err.message().to_string()).caused_by(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Record what was being done, if this is an error
    fn context(self, step: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`] but only builds the text on error
    fn with_context<S: Into<String>>(self, step: impl FnOnce() -> S) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, step: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(step))
    }

    fn with_context<S: Into<String>>(self, step: impl FnOnce() -> S) -> Result<T> {
        self.map_err(|e| e.into().context(step()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::ConfigParse.to_string(), "E3002");
        assert_eq!(ErrorCode::Json.to_string(), "E4000");
    }

    #[test]
    fn test_config_category() {
        assert!(ErrorCode::ConfigNotFound.is_config());
        assert!(!ErrorCode::Io.is_config());
    }

    #[test]
    fn test_context_trail_in_display() {
        let err = Error::config_not_found(Path::new("/etc/partnersell.toml"))
            .context("loading client configuration")
            .context("starting client");

        let text = err.to_string();
        assert!(text.starts_with("[E3001] configuration file not found"));
        assert!(text.contains("while: loading client configuration\n  while: starting client"));
        assert!(text.contains("hint: "));
    }

    #[test]
    fn test_io_not_found_code() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_error_code() {
        let err: Error = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
        assert_eq!(err.code, ErrorCode::Json);
    }

    #[test]
    fn test_result_ext_converts_and_adds_context() {
        let result: std::result::Result<u8, _> = toml::from_str::<u8>("not toml =");
        let err = result.context("reading [retry]").unwrap_err();

        assert_eq!(err.code, ErrorCode::ConfigParse);
        assert_eq!(err.context, vec!["reading [retry]".to_string()]);
    }

    #[test]
    fn test_with_context_is_lazy_on_success() {
        let ok: Result<u8> = Ok(1);
        let value = ok.with_context(|| -> String { panic!("context built on success") });
        assert_eq!(value.unwrap(), 1);
    }
}
