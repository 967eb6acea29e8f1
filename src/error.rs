/*
 * luet-pm - Terminal front-end for the luet package manager.
 * Copyright (C) 2025  luet-pm contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Error types shared by the command runner and the luet operations.

use thiserror::Error;

/// Main error type for luet-pm operations
#[derive(Debug, Error)]
pub enum LuetError {
    /// Root is required but neither pkexec nor sudo could be found
    #[error("No elevation helper available")]
    ElevationUnavailable,

    /// The external command ran but reported failure
    #[error("{command} failed with return code {code}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The external command could not be started
    #[error("Error executing command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// luet printed something that is not the JSON we asked for
    #[error("Invalid JSON output")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    /// Removal of a protected package was requested
    #[error("{message}")]
    Protected { package: String, message: String },

    /// Package is not known to any repository
    #[error("Package '{package}' not found")]
    PackageNotFound { package: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File system errors
    #[error("File system error for '{path}': {message}")]
    FileSystem {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Interrupted operation
    #[error("Operation interrupted")]
    Interrupted,

    /// Generic/wrapped error
    #[error("{0}")]
    Other(String),
}

impl LuetError {
    /// Create a command failure from a rendered argv and its captured output
    pub fn command_failed(argv: &[String], code: i32, stderr: impl Into<String>) -> Self {
        LuetError::CommandFailed {
            command: argv.join(" "),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(argv: &[String], source: std::io::Error) -> Self {
        LuetError::Spawn {
            command: argv.join(" "),
            source,
        }
    }

    /// Create a filesystem error
    pub fn filesystem(path: impl Into<String>, message: impl Into<String>, source: std::io::Error) -> Self {
        LuetError::FileSystem {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Exit code to report for this error when an operation has to end with one
    pub fn exit_code(&self) -> i32 {
        match self {
            LuetError::CommandFailed { code, .. } => *code,
            _ => -1,
        }
    }
}

impl From<serde_json::Error> for LuetError {
    fn from(source: serde_json::Error) -> Self {
        LuetError::InvalidJson { source }
    }
}

/// Result type alias for luet-pm operations
pub type LuetResult<T> = std::result::Result<T, LuetError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> LuetResult<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ErrorContext<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> LuetResult<T> {
        self.map_err(|e| LuetError::Other(format!("{}: {}", context.into(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let argv = vec!["luet".to_string(), "oscheck".to_string()];
        let err = LuetError::command_failed(&argv, 2, "");
        assert_eq!(format!("{}", err), "luet oscheck failed with return code 2");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_protected_display_is_message() {
        let err = LuetError::Protected {
            package: "apps/grub".to_string(),
            message: "This package is protected and can't be removed".to_string(),
        };
        assert_eq!(format!("{}", err), "This package is protected and can't be removed");
        assert_eq!(err.exit_code(), -1);
    }

    #[test]
    fn test_invalid_json_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: LuetError = parse.unwrap_err().into();
        assert_eq!(format!("{}", err), "Invalid JSON output");
    }

    #[test]
    fn test_context() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = res.context("reading SYNCTIME").unwrap_err();
        assert_eq!(format!("{}", err), "reading SYNCTIME: boom");
    }
}
