//! Domain errors - failures raised while applying remote data to the cache

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Malformed Payloads
    // =========================================================================
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid snowflake")]
    InvalidSnowflake,

    // =========================================================================
    // Unknown References
    // =========================================================================
    #[error("Unknown guild: {0}")]
    UnknownGuild(Snowflake),

    #[error("Unknown channel: {0}")]
    UnknownChannel(Snowflake),

    #[error("Unknown member {user_id} in guild {guild_id}")]
    UnknownMember {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("Unknown message: {0}")]
    UnknownMessage(Snowflake),
}

impl DomainError {
    /// Stable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidSnowflake => "INVALID_SNOWFLAKE",
            Self::UnknownGuild(_) => "UNKNOWN_GUILD",
            Self::UnknownChannel(_) => "UNKNOWN_CHANNEL",
            Self::UnknownMember { .. } => "UNKNOWN_MEMBER",
            Self::UnknownMessage(_) => "UNKNOWN_MESSAGE",
        }
    }

    /// The event named something the cache has never seen
    pub fn is_unknown_reference(&self) -> bool {
        matches!(
            self,
            Self::UnknownGuild(_)
                | Self::UnknownChannel(_)
                | Self::UnknownMember { .. }
                | Self::UnknownMessage(_)
        )
    }

    /// The payload itself was structurally invalid
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload(_) | Self::MissingField(_) | Self::InvalidSnowflake
        )
    }
}

impl From<crate::value_objects::SnowflakeParseError> for DomainError {
    fn from(_: crate::value_objects::SnowflakeParseError) -> Self {
        Self::InvalidSnowflake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::UnknownGuild(Snowflake::new(1)).code(), "UNKNOWN_GUILD");
        assert_eq!(DomainError::MissingField("id").code(), "MISSING_FIELD");
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::UnknownChannel(Snowflake::new(1)).is_unknown_reference());
        assert!(!DomainError::UnknownChannel(Snowflake::new(1)).is_malformed());
        assert!(DomainError::MalformedPayload("x".into()).is_malformed());
        assert!(!DomainError::InvalidSnowflake.is_unknown_reference());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::UnknownMember {
            guild_id: Snowflake::new(1),
            user_id: Snowflake::new(2),
        };
        assert_eq!(err.to_string(), "Unknown member 2 in guild 1");
    }
}
