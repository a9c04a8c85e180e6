use serde::{Deserialize, Serialize};

/// Raised when webhook or response bytes cannot be decoded into the expected
/// shape. Keeps the offending content around for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("can not unmarshal content: {}", String::from_utf8_lossy(.content))]
pub struct UnmarshalError {
    content: Vec<u8>,
    #[source]
    source: Option<serde_json::Error>,
}

impl UnmarshalError {
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: serde_json::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Raw bytes that failed to decode.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Lossy UTF-8 rendering of [`Self::content`].
    pub fn content_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Underlying JSON error, when the failure came from the decoder.
    pub fn json_error(&self) -> Option<&serde_json::Error> {
        self.source.as_ref()
    }
}

/// Decode `bytes` as JSON, wrapping failures in [`UnmarshalError`].
pub fn from_json_slice<T>(bytes: &[u8]) -> Result<T, UnmarshalError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(|e| UnmarshalError::new(bytes).with_source(e))
}

/// Error envelope returned by the Graph API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error_subcode: i64,
    #[serde(default)]
    pub fbtrace_id: String,
}
