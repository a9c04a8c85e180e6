//! HTTP transport seam.
//!
//! The dispatcher only needs "POST this body, give me the response bytes".
//! [`ReqwestTransport`] is the production implementation; tests plug in
//! their own.

use {
    async_trait::async_trait,
    bytes::Bytes,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    tracing::debug,
    url::Url,
};

use crate::{Error, Result};

/// Multipart upload body with the `recipient`, `message` and `filedata`
/// fields the send API expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub recipient: String,
    pub message: String,
    pub filename: String,
    pub content_type: &'static str,
    pub filedata: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Json(Vec<u8>),
    Multipart(MultipartBody),
}

/// A single POST to the Graph API.
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Endpoint including the `access_token` query parameter.
    pub url: Url,
    pub body: RequestBody,
}

impl std::fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("endpoint", &self.url.path())
            .field("body", &self.body)
            .finish()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the request and return the raw response body, whatever the HTTP
    /// status. The platform reports failures inside the body.
    async fn post(&self, request: OutboundRequest) -> Result<Bytes>;
}

/// Transport backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client with an optional per-request deadline.
    pub fn with_timeout(timeout: Option<std::time::Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: OutboundRequest) -> Result<Bytes> {
        let builder = self.client.post(request.url);
        let builder = match request.body {
            RequestBody::Json(body) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
            RequestBody::Multipart(body) => {
                let filedata = Part::bytes(body.filedata.to_vec())
                    .file_name(body.filename)
                    .mime_str(body.content_type)
                    .map_err(|e| Error::external("failed to create file part", e))?;
                let form = Form::new()
                    .text("recipient", body.recipient)
                    .text("message", body.message)
                    .part("filedata", filedata);
                builder.multipart(form)
            },
        };

        // The URL carries the access token; keep it out of error text.
        let response = builder.send().await.map_err(redact)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(redact)?;
        debug!(%status, size = bytes.len(), "graph api responded");
        Ok(bytes)
    }
}

fn redact(err: reqwest::Error) -> Error {
    Error::Http(err.without_url())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn url_for(server: &mockito::ServerGuard) -> Url {
        Url::parse(&format!("{}/v2.11/me/messages?access_token=tok", server.url())).unwrap()
    }

    #[tokio::test]
    async fn posts_json_and_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2.11/me/messages")
            .match_query(mockito::Matcher::UrlEncoded(
                "access_token".into(),
                "tok".into(),
            ))
            .match_header("content-type", "application/json")
            .match_body(r#"{"a":1}"#)
            .with_status(200)
            .with_body(r#"{"message_id":"ABCD"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::default();
        let body = transport
            .post(OutboundRequest {
                url: url_for(&server),
                body: RequestBody::Json(br#"{"a":1}"#.to_vec()),
            })
            .await
            .unwrap();

        assert_eq!(&body[..], br#"{"message_id":"ABCD"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_still_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad"}}"#)
            .create_async()
            .await;

        let body = ReqwestTransport::default()
            .post(OutboundRequest {
                url: url_for(&server),
                body: RequestBody::Json(b"{}".to_vec()),
            })
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"error":{"message":"bad"}}"#);
    }

    #[tokio::test]
    async fn multipart_carries_fields_and_sniffed_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2.11/me/messages")
            .match_query(mockito::Matcher::Any)
            .match_header(
                "content-type",
                mockito::Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="recipient"\s+\{"id":"154"\}"#.into()),
                mockito::Matcher::Regex(r#"name="filedata"; filename="photo.png""#.into()),
                mockito::Matcher::Regex("Content-Type: image/jpeg".into()),
            ]))
            .with_body(r#"{"recipient_id":"154","message_id":"m1"}"#)
            .create_async()
            .await;

        let body = ReqwestTransport::default()
            .post(OutboundRequest {
                url: url_for(&server),
                body: RequestBody::Multipart(MultipartBody {
                    recipient: r#"{"id":"154"}"#.into(),
                    message: r#"{"attachment":{"type":"image","payload":{}}}"#.into(),
                    filename: "photo.png".into(),
                    content_type: "image/jpeg",
                    filedata: Bytes::from_static(b"ascii-jpeg-stand-in"),
                }),
            })
            .await
            .unwrap();

        assert!(!body.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connect_failure_does_not_leak_access_token() {
        let err = ReqwestTransport::default()
            .post(OutboundRequest {
                url: Url::parse(
                    "http://127.0.0.1:1/v2.11/me/messages?access_token=SECRET-PAGE-TOKEN",
                )
                .unwrap(),
                body: RequestBody::Json(b"{}".to_vec()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(!err.to_string().contains("SECRET-PAGE-TOKEN"));
        assert!(!format!("{err:?}").contains("SECRET-PAGE-TOKEN"));
    }

    #[test]
    fn debug_hides_access_token() {
        let request = OutboundRequest {
            url: Url::parse("https://graph.facebook.com/v2.11/me/messages?access_token=secret")
                .unwrap(),
            body: RequestBody::Json(Vec::new()),
        };
        let debug_output = format!("{request:?}");
        assert!(!debug_output.contains("secret"));
        assert!(debug_output.contains("/v2.11/me/messages"));
    }
}
