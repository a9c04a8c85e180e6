use {
    messenger_protocol::{QueryError, UnmarshalError},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    /// Response or webhook bytes did not decode.
    #[error(transparent)]
    Unmarshal(#[from] UnmarshalError),

    /// The platform answered with an error envelope.
    #[error(transparent)]
    Remote(#[from] QueryError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Outbound envelope could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Configuration value did not match `MessengerConfig`.
    #[error("invalid messenger config: {0}")]
    Config(#[source] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid messenger input: {message}")]
    InvalidInput { message: String },

    #[error("dispatch cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this is a decode failure.
    pub fn is_unmarshal(&self) -> bool {
        matches!(self, Self::Unmarshal(_))
    }

    /// Whether the platform rejected the request.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The platform error envelope, if this is a remote error.
    pub fn remote(&self) -> Option<&QueryError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_platform_message() {
        let err = Error::from(QueryError {
            message: "(#100) No matching user found".into(),
            kind: "OAuthException".into(),
            code: 100,
            error_subcode: 2_018_001,
            fbtrace_id: "trace".into(),
        });
        assert!(err.is_remote());
        assert!(!err.is_unmarshal());
        assert_eq!(err.to_string(), "(#100) No matching user found");
        assert_eq!(err.remote().unwrap().error_subcode, 2_018_001);
    }

    #[test]
    fn unmarshal_error_is_distinct_from_remote() {
        let err = Error::from(UnmarshalError::new(b"<html>".to_vec()));
        assert!(err.is_unmarshal());
        assert!(!err.is_remote());
        assert!(err.remote().is_none());
        assert_eq!(err.to_string(), "can not unmarshal content: <html>");
    }
}
