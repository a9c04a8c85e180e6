//! Build-and-send convenience layer.

use std::sync::Arc;

use {
    bytes::Bytes,
    image::DynamicImage,
    messenger_protocol::{
        QueryResponse, Recipient,
        receive::QuickReply,
        send::{
            AttachmentType, ReceiptPayload, SenderAction, StructuredMessageAttachment,
            StructuredMessageButton, StructuredMessageElement,
        },
    },
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{
    Result,
    builder::{Envelope, MessageBuilder, SendOptions},
    config::MessengerConfig,
    dispatch::Dispatcher,
};

/// Long-lived client for one page access token.
#[derive(Debug, Clone)]
pub struct Messenger {
    config: Arc<MessengerConfig>,
    dispatcher: Arc<Dispatcher>,
}

impl Messenger {
    pub fn new(config: MessengerConfig) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(&config)?;
        info!(
            api_version = %config.api_version,
            graph_base_url = %config.graph_base_url,
            "messenger client ready"
        );
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::new(MessengerConfig::from_value(value)?)
    }

    /// Use a prebuilt dispatcher, e.g. one over a custom transport.
    #[must_use]
    pub fn with_dispatcher(config: MessengerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Reply handle addressed to `to`.
    #[must_use]
    pub fn response_to(&self, to: Recipient) -> Response {
        Response {
            builder: MessageBuilder::new(to),
            dispatcher: Arc::clone(&self.dispatcher),
            inbox_app_id: self.config.inbox_app_id,
        }
    }
}

/// Sends to one recipient. Each method builds an envelope and dispatches it.
#[derive(Debug, Clone)]
pub struct Response {
    builder: MessageBuilder,
    dispatcher: Arc<Dispatcher>,
    inbox_app_id: i64,
}

impl Response {
    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }

    pub async fn send(&self, envelope: Envelope) -> Result<QueryResponse> {
        self.dispatcher.dispatch(&envelope).await
    }

    pub async fn send_with_cancel(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        self.dispatcher.dispatch_with_cancel(&envelope, cancel).await
    }

    pub async fn text(
        &self,
        text: impl Into<String>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.text(text, options)).await
    }

    pub async fn text_with_replies(
        &self,
        text: impl Into<String>,
        replies: Vec<QuickReply>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.text_with_replies(text, replies, options))
            .await
    }

    pub async fn attachment_with_replies(
        &self,
        attachment: StructuredMessageAttachment,
        replies: Vec<QuickReply>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(
            self.builder
                .attachment_with_replies(attachment, replies, options),
        )
        .await
    }

    pub async fn attachment(
        &self,
        kind: AttachmentType,
        url: impl Into<String>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.attachment(kind, url, options)?).await
    }

    pub async fn attachment_data(
        &self,
        kind: AttachmentType,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<QueryResponse> {
        self.send(self.builder.attachment_data(kind, filename, data)?)
            .await
    }

    pub async fn image(&self, img: &DynamicImage) -> Result<QueryResponse> {
        self.send(self.builder.image(img)?).await
    }

    pub async fn button_template(
        &self,
        text: impl Into<String>,
        buttons: Vec<StructuredMessageButton>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.button_template(text, buttons, options))
            .await
    }

    pub async fn generic_template(
        &self,
        elements: Vec<StructuredMessageElement>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.generic_template(elements, options))
            .await
    }

    pub async fn list_template(
        &self,
        elements: Vec<StructuredMessageElement>,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.list_template(elements, options)).await
    }

    pub async fn receipt_template(
        &self,
        receipt: ReceiptPayload,
        options: &SendOptions,
    ) -> Result<QueryResponse> {
        self.send(self.builder.receipt_template(receipt, options))
            .await
    }

    pub async fn sender_action(&self, action: SenderAction) -> Result<QueryResponse> {
        self.send(self.builder.sender_action(action)).await
    }

    pub async fn react(
        &self,
        message_id: impl Into<String>,
        reaction: impl Into<String>,
    ) -> Result<QueryResponse> {
        self.send(self.builder.react(message_id, reaction)).await
    }

    pub async fn unreact(&self, message_id: impl Into<String>) -> Result<QueryResponse> {
        self.send(self.builder.unreact(message_id)).await
    }

    /// Hand the conversation to the configured inbox app.
    pub async fn pass_thread_to_inbox(&self) -> Result<()> {
        let request = self.builder.pass_thread_to_inbox(self.inbox_app_id);
        self.dispatcher.pass_thread_control(&request).await
    }
}
