//! Size limits for everything that crosses the host boundary.
//!
//! The bounds are part of the host contract and must not be tuned at runtime.

use crate::core::error::ValidationError;

pub const MAX_FILEPATH_LENGTH: usize = 1024;
pub const MAX_GUID_LENGTH: usize = 128;
pub const MAX_JAVASCRIPT_SOURCE_LENGTH: usize = 1024 * 1024;
pub const MAX_JSON_LENGTH: usize = 10 * 1024 * 1024;
pub const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_SERVICE_NAME_LENGTH: usize = 128;
pub const MAX_LOG_MESSAGE_LENGTH: usize = 1024 * 1024;

/// 1 MiB is plenty for an individual actor's string.
pub const MAX_ACTOR_STRING_LENGTH: usize = 1024 * 1024;

/// A named bound on a host-supplied string or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    FilePath,
    Identifier,
    ScriptSource,
    Json,
    Buffer,
    ServiceName,
    LogMessage,
    ActorString,
}

impl Limit {
    pub const fn max_bytes(self) -> usize {
        match self {
            Limit::FilePath => MAX_FILEPATH_LENGTH,
            Limit::Identifier => MAX_GUID_LENGTH,
            Limit::ScriptSource => MAX_JAVASCRIPT_SOURCE_LENGTH,
            Limit::Json => MAX_JSON_LENGTH,
            Limit::Buffer => MAX_BUFFER_SIZE,
            Limit::ServiceName => MAX_SERVICE_NAME_LENGTH,
            Limit::LogMessage => MAX_LOG_MESSAGE_LENGTH,
            Limit::ActorString => MAX_ACTOR_STRING_LENGTH,
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Limit::FilePath => "file path",
            Limit::Identifier => "identifier",
            Limit::ScriptSource => "script source",
            Limit::Json => "JSON payload",
            Limit::Buffer => "byte buffer",
            Limit::ServiceName => "service name",
            Limit::LogMessage => "log message",
            Limit::ActorString => "actor string",
        }
    }

    /// Checks a required, non-empty string against this bound.
    pub fn check(self, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(self.reject(ValidationError::Empty {
                what: self.describe(),
            }));
        }
        self.check_len(value.len())
    }

    /// Checks a length that is allowed to be zero (buffers, optional payloads).
    pub fn check_len(self, len: usize) -> Result<(), ValidationError> {
        if len > self.max_bytes() {
            return Err(self.reject(ValidationError::too_long(self, len)));
        }
        Ok(())
    }

    // Bound violations only ever go to tracing: forwarding an oversized log
    // message to the host sink is exactly what the bound prevents.
    fn reject(self, err: ValidationError) -> ValidationError {
        tracing::warn!(target: "brain", limit = self.describe(), "{}", err);
        err
    }
}
