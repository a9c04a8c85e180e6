//! Serialize, send, decode, unwrap.
//!
//! Every dispatch is one round trip: `Serialized → Sent → {DecodeFailed |
//! RemoteError | Success}`. Nothing is retried and nothing is kept between
//! calls, so a single [`Dispatcher`] can be shared across tasks.

use std::sync::Arc;

use {
    messenger_protocol::{QueryResponse, send::PassThreadControl},
    secrecy::ExposeSecret,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    Error, Result,
    builder::Envelope,
    config::MessengerConfig,
    transport::{MultipartBody, OutboundRequest, RequestBody, ReqwestTransport, Transport},
};

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    send_url: Url,
    thread_control_url: Url,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("send_endpoint", &self.send_url.path())
            .field("thread_control_endpoint", &self.thread_control_url.path())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher over a pooled reqwest client honouring the configured
    /// request timeout.
    pub fn from_config(config: &MessengerConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.request_timeout())?;
        Self::new(config, Arc::new(transport))
    }

    pub fn new(config: &MessengerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let token = config.access_token.expose_secret();
        Ok(Self {
            transport,
            send_url: with_access_token(config.send_message_url()?, token),
            thread_control_url: with_access_token(config.thread_control_url()?, token),
        })
    }

    /// Send an envelope and unwrap the platform's response.
    pub async fn dispatch(&self, envelope: &Envelope) -> Result<QueryResponse> {
        let body = serialize(envelope)?;
        debug!(
            kind = envelope.kind(),
            recipient_id = ?envelope.recipient().id,
            "dispatching envelope"
        );
        let raw = self
            .transport
            .post(OutboundRequest {
                url: self.send_url.clone(),
                body,
            })
            .await?;
        let response = decode_query_response(&raw)?;
        debug!(
            recipient_id = %response.recipient_id,
            message_id = %response.message_id,
            "envelope accepted"
        );
        Ok(response)
    }

    /// [`Self::dispatch`], abandoned as soon as `cancel` fires.
    pub async fn dispatch_with_cancel(
        &self,
        envelope: &Envelope,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(kind = envelope.kind(), "dispatch cancelled");
                Err(Error::Cancelled)
            },
            result = self.dispatch(envelope) => result,
        }
    }

    /// Post a handover request. Only the absence of an error matters; the
    /// response body is otherwise discarded.
    pub async fn pass_thread_control(&self, request: &PassThreadControl) -> Result<()> {
        let body = serde_json::to_vec(request)?;
        debug!(
            recipient_id = ?request.recipient.id,
            target_app_id = request.target_app_id,
            "passing thread control"
        );
        let raw = self
            .transport
            .post(OutboundRequest {
                url: self.thread_control_url.clone(),
                body: RequestBody::Json(body),
            })
            .await?;
        decode_query_response(&raw).map(|_| ())
    }
}

fn with_access_token(mut url: Url, token: &str) -> Url {
    url.query_pairs_mut().append_pair("access_token", token);
    url
}

fn serialize(envelope: &Envelope) -> Result<RequestBody> {
    if let Envelope::Upload(upload) = envelope {
        return Ok(RequestBody::Multipart(MultipartBody {
            recipient: upload.recipient_field()?,
            message: upload.message_field()?,
            filename: upload.filename.clone(),
            content_type: upload.content_type,
            filedata: upload.data.clone(),
        }));
    }
    match envelope.to_json()? {
        Some(body) => Ok(RequestBody::Json(body)),
        None => Err(Error::invalid_input(format!(
            "{} envelope has no JSON form",
            envelope.kind()
        ))),
    }
}

/// Decode a send API response, turning an error envelope into
/// [`Error::Remote`].
pub fn decode_query_response(raw: &[u8]) -> Result<QueryResponse> {
    let mut response = QueryResponse::from_slice(raw)?;
    if let Some(error) = response.error.take() {
        warn!(
            code = error.code,
            error_subcode = error.error_subcode,
            error_type = %error.kind,
            fbtrace_id = %error.fbtrace_id,
            "graph api returned an error: {}",
            error.message
        );
        return Err(Error::Remote(error));
    }
    Ok(response)
}
