//! Driver parameter parsing and validation.
//!
//! Parameters come from an ODBC connection string of `KEY=value` pairs
//! separated by `;`. Values wrapped in braces may contain `;` and use `}}`
//! for a literal `}`.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Driver log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing-subscriber` filters.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    /// Parse a level name or a number from 0 (off) to 5 (trace).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "off" => Ok(LogLevel::Off),
            "1" | "error" => Ok(LogLevel::Error),
            "2" | "warn" | "warning" => Ok(LogLevel::Warn),
            "3" | "info" => Ok(LogLevel::Info),
            "4" | "debug" => Ok(LogLevel::Debug),
            "5" | "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigError::InvalidParameter {
                parameter: "LOG_LEVEL".to_string(),
                message: format!("Unknown log level '{}'", other),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

/// Driver parameters for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverParams {
    /// Data source name
    pub dsn: Option<String>,

    /// Driver name or path
    pub driver: Option<String>,

    /// Log verbosity (default: warn)
    pub log_level: LogLevel,

    /// Log file; logs go to stderr when unset
    pub log_filename: Option<PathBuf>,

    /// Keys the driver does not interpret, upper-cased
    pub attributes: HashMap<String, String>,
}

impl DriverParams {
    /// Create a new DriverParamsBuilder.
    pub fn builder() -> DriverParamsBuilder {
        DriverParamsBuilder::new()
    }
}

impl FromStr for DriverParams {
    type Err = ConfigError;

    /// Parse a connection string such as
    /// `DSN=tarantool;LOG_LEVEL=debug;LOG_FILENAME={/tmp/odbc;trace.log}`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use odbc_stmt_rs::connection::{DriverParams, LogLevel};
    /// # use std::str::FromStr;
    /// let params = DriverParams::from_str("DSN=test;LOG_LEVEL=4")?;
    /// assert_eq!(params.dsn.as_deref(), Some("test"));
    /// assert_eq!(params.log_level, LogLevel::Debug);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut builder = DriverParamsBuilder::new();
        for (key, value) in parse_pairs(s)? {
            builder = match key.to_ascii_uppercase().as_str() {
                "DSN" => builder.dsn(&value),
                "DRIVER" => builder.driver(&value),
                "LOG_LEVEL" => builder.log_level(value.parse()?),
                "LOG_FILENAME" => builder.log_filename(&value),
                other => builder.attribute(other, &value),
            };
        }
        builder.build()
    }
}

impl fmt::Display for DriverParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dsn) = &self.dsn {
            write!(f, "DSN={};", quote(dsn))?;
        }
        if let Some(driver) = &self.driver {
            write!(f, "DRIVER={};", quote(driver))?;
        }
        write!(f, "LOG_LEVEL={};", self.log_level)?;
        if let Some(path) = &self.log_filename {
            write!(f, "LOG_FILENAME={};", quote(&path.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    if value.contains([';', '{', '}']) || value.trim() != value {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Builder for constructing DriverParams with validation.
#[derive(Debug, Clone, Default)]
pub struct DriverParamsBuilder {
    dsn: Option<String>,
    driver: Option<String>,
    log_level: Option<LogLevel>,
    log_filename: Option<String>,
    attributes: HashMap<String, String>,
}

impl DriverParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data source name.
    pub fn dsn(mut self, dsn: &str) -> Self {
        self.dsn = Some(dsn.to_string());
        self
    }

    /// Set the driver name.
    pub fn driver(mut self, driver: &str) -> Self {
        self.driver = Some(driver.to_string());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_filename(mut self, path: &str) -> Self {
        self.log_filename = Some(path.to_string());
        self
    }

    /// Add a free-form attribute.
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes
            .insert(key.to_ascii_uppercase(), value.to_string());
        self
    }

    /// Build the DriverParams with validation.
    pub fn build(self) -> Result<DriverParams, ConfigError> {
        if self.dsn.is_none() && self.driver.is_none() {
            return Err(ConfigError::InvalidParameter {
                parameter: "DSN".to_string(),
                message: "Either DSN or DRIVER is required".to_string(),
            });
        }
        if self.dsn.as_deref() == Some("") {
            return Err(ConfigError::InvalidParameter {
                parameter: "DSN".to_string(),
                message: "DSN cannot be empty".to_string(),
            });
        }

        let log_filename = match self.log_filename {
            Some(path) if path.is_empty() => {
                return Err(ConfigError::InvalidParameter {
                    parameter: "LOG_FILENAME".to_string(),
                    message: "Log file name cannot be empty".to_string(),
                });
            }
            Some(path) => Some(PathBuf::from(path)),
            None => None,
        };

        Ok(DriverParams {
            dsn: self.dsn,
            driver: self.driver,
            log_level: self.log_level.unwrap_or_default(),
            log_filename,
            attributes: self.attributes,
        })
    }
}

/// Split a connection string into key/value pairs.
fn parse_pairs(s: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
        let Some((key, tail)) = rest.split_once('=') else {
            return Err(ConfigError::ParseError(format!(
                "Invalid attribute format: {}",
                rest
            )));
        };
        let key = key.trim();
        if key.is_empty() || key.contains(';') {
            return Err(ConfigError::ParseError(format!(
                "Invalid attribute key: '{}'",
                key
            )));
        }

        let tail = tail.trim_start();
        let (value, remainder) = if let Some(braced) = tail.strip_prefix('{') {
            parse_braced(braced).ok_or_else(|| {
                ConfigError::ParseError(format!("Unterminated braced value for '{}'", key))
            })?
        } else {
            match tail.split_once(';') {
                Some((value, remainder)) => (value.trim().to_string(), remainder),
                None => (tail.trim().to_string(), ""),
            }
        };

        pairs.push((key.to_string(), value));
        rest = remainder.trim_start_matches([';', ' ', '\t']).trim();
    }

    Ok(pairs)
}

/// Read a braced value up to its closing brace. Returns the unescaped value
/// and the text after it.
fn parse_braced(s: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '}' {
            if let Some((_, '}')) = chars.peek() {
                chars.next();
                value.push('}');
                continue;
            }
            let after = &s[i + 1..];
            let after = after.trim_start();
            return match after.strip_prefix(';') {
                Some(remainder) => Some((value, remainder)),
                None if after.is_empty() => Some((value, "")),
                None => None,
            };
        }
        value.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_connection_string() {
        let params = DriverParams::from_str("DSN=tarantool;DRIVER=odbc-stmt").unwrap();
        assert_eq!(params.dsn.as_deref(), Some("tarantool"));
        assert_eq!(params.driver.as_deref(), Some("odbc-stmt"));
        assert_eq!(params.log_level, LogLevel::Warn);
        assert!(params.log_filename.is_none());
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let params = DriverParams::from_str("dsn=test;log_level=TRACE").unwrap();
        assert_eq!(params.dsn.as_deref(), Some("test"));
        assert_eq!(params.log_level, LogLevel::Trace);
    }

    #[test]
    fn test_numeric_log_level() {
        let params = DriverParams::from_str("DSN=test;LOG_LEVEL=3").unwrap();
        assert_eq!(params.log_level, LogLevel::Info);
    }

    #[test]
    fn test_braced_values() {
        let params =
            DriverParams::from_str("DRIVER={Tarantool ODBC;v2};LOG_FILENAME={/tmp/a}}b.log}")
                .unwrap();
        assert_eq!(params.driver.as_deref(), Some("Tarantool ODBC;v2"));
        assert_eq!(params.log_filename, Some(PathBuf::from("/tmp/a}b.log")));
    }

    #[test]
    fn test_unknown_keys_kept_as_attributes() {
        let params = DriverParams::from_str("DSN=test;Server=localhost;PORT=3301;").unwrap();
        assert_eq!(params.attributes.get("SERVER").map(String::as_str), Some("localhost"));
        assert_eq!(params.attributes.get("PORT").map(String::as_str), Some("3301"));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = DriverParams::from_str("DSN=test;LOG_LEVEL=loud").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter { ref parameter, .. } if parameter == "LOG_LEVEL"
        ));
    }

    #[test]
    fn test_missing_equals() {
        let err = DriverParams::from_str("DSN=test;garbage").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unterminated_brace() {
        let err = DriverParams::from_str("DSN={test").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_dsn_or_driver_required() {
        let err = DriverParams::from_str("LOG_LEVEL=debug").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }

    #[test]
    fn test_builder_rejects_empty_log_file() {
        let result = DriverParams::builder().dsn("test").log_filename("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let params = DriverParams::builder()
            .dsn("test")
            .driver("My;Driver")
            .log_level(LogLevel::Debug)
            .build()
            .unwrap();
        let parsed = DriverParams::from_str(&params.to_string()).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace > LogLevel::Debug);
        assert!(LogLevel::Off < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_filter(), "info");
    }
}
