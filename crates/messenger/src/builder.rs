//! Outbound envelope construction.
//!
//! [`MessageBuilder`] turns content into an [`Envelope`] without touching the
//! network; the [`crate::dispatch::Dispatcher`] sends it.

use {
    bytes::Bytes,
    image::DynamicImage,
    messenger_protocol::{
        receive::{QuickReply, Recipient},
        send::{
            AttachmentType, MessageData, MessagingType, PassThreadControl, ReceiptPayload,
            SendMessage, SendSenderAction, SendStructuredMessage, SenderAction,
            SenderActionPayload, StructuredMessageAttachment, StructuredMessageButton,
            StructuredMessageData, StructuredMessageElement, TemplatePayload, ThreadControl,
            TopElementStyle,
        },
    },
    serde::Serialize,
    tracing::debug,
};

use crate::{Error, Result, media, sniff};

const INBOX_HANDOVER_METADATA: &str = "Passing to inbox secondary app";
const IMAGE_FILENAME: &str = "image.jpg";

/// Messaging type, metadata and tag shared by every message operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub messaging_type: MessagingType,
    pub metadata: Option<String>,
    /// Only meaningful with [`MessagingType::MessageTag`]; not validated.
    pub tag: Option<String>,
    pub thread_control: Option<ThreadControl>,
}

impl SendOptions {
    #[must_use]
    pub fn new(messaging_type: MessagingType) -> Self {
        Self {
            messaging_type,
            metadata: None,
            tag: None,
            thread_control: None,
        }
    }

    #[must_use]
    pub fn response() -> Self {
        Self::new(MessagingType::Response)
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Use the first of `tags`, if any.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag = tags.into_iter().next().map(Into::into);
        self
    }

    /// Hand the thread over to the inbox in the same call.
    #[must_use]
    pub fn with_thread_control(mut self) -> Self {
        self.thread_control = Some(ThreadControl::pass());
        self
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::response()
    }
}

/// Binary attachment upload, sent as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub recipient: Recipient,
    pub kind: AttachmentType,
    pub filename: String,
    /// Sniffed from the payload, not taken from `filename`.
    pub content_type: &'static str,
    pub data: Bytes,
}

#[derive(Serialize)]
struct UploadMessage {
    attachment: UploadAttachment,
}

#[derive(Serialize)]
struct UploadAttachment {
    #[serde(rename = "type")]
    kind: AttachmentType,
    payload: serde_json::Map<String, serde_json::Value>,
}

impl AttachmentUpload {
    /// JSON for the `recipient` form field.
    pub fn recipient_field(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.recipient)?)
    }

    /// JSON for the `message` form field.
    pub fn message_field(&self) -> Result<String> {
        let message = UploadMessage {
            attachment: UploadAttachment {
                kind: self.kind,
                payload: serde_json::Map::new(),
            },
        };
        Ok(serde_json::to_string(&message)?)
    }
}

/// One outbound request to the send API.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Message(SendMessage),
    Structured(SendStructuredMessage),
    SenderAction(SendSenderAction),
    Upload(AttachmentUpload),
}

impl Envelope {
    pub fn recipient(&self) -> &Recipient {
        match self {
            Self::Message(m) => &m.recipient,
            Self::Structured(m) => &m.recipient,
            Self::SenderAction(a) => &a.recipient,
            Self::Upload(u) => &u.recipient,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Structured(_) => "structured",
            Self::SenderAction(_) => "sender_action",
            Self::Upload(_) => "upload",
        }
    }

    /// JSON body for non-multipart envelopes. `None` for uploads.
    pub fn to_json(&self) -> Result<Option<Vec<u8>>> {
        let body = match self {
            Self::Message(m) => serde_json::to_vec(m)?,
            Self::Structured(m) => serde_json::to_vec(m)?,
            Self::SenderAction(a) => serde_json::to_vec(a)?,
            Self::Upload(_) => return Ok(None),
        };
        Ok(Some(body))
    }
}

impl From<SendMessage> for Envelope {
    fn from(message: SendMessage) -> Self {
        Self::Message(message)
    }
}

impl From<SendStructuredMessage> for Envelope {
    fn from(message: SendStructuredMessage) -> Self {
        Self::Structured(message)
    }
}

impl From<SendSenderAction> for Envelope {
    fn from(action: SendSenderAction) -> Self {
        Self::SenderAction(action)
    }
}

impl From<AttachmentUpload> for Envelope {
    fn from(upload: AttachmentUpload) -> Self {
        Self::Upload(upload)
    }
}

/// Builds envelopes addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuilder {
    to: Recipient,
}

impl MessageBuilder {
    #[must_use]
    pub fn new(to: Recipient) -> Self {
        Self { to }
    }

    pub fn recipient(&self) -> &Recipient {
        &self.to
    }

    pub fn text(&self, text: impl Into<String>, options: &SendOptions) -> Envelope {
        self.text_with_replies(text, Vec::new(), options)
    }

    pub fn text_with_replies(
        &self,
        text: impl Into<String>,
        replies: Vec<QuickReply>,
        options: &SendOptions,
    ) -> Envelope {
        self.message(
            MessageData {
                text: Some(text.into()),
                attachment: None,
                quick_replies: replies,
                metadata: options.metadata.clone(),
            },
            options,
        )
    }

    pub fn attachment_with_replies(
        &self,
        attachment: StructuredMessageAttachment,
        replies: Vec<QuickReply>,
        options: &SendOptions,
    ) -> Envelope {
        self.message(
            MessageData {
                text: None,
                attachment: Some(attachment),
                quick_replies: replies,
                metadata: options.metadata.clone(),
            },
            options,
        )
    }

    /// Media the platform fetches from `url`.
    pub fn attachment(
        &self,
        kind: AttachmentType,
        url: impl Into<String>,
        options: &SendOptions,
    ) -> Result<Envelope> {
        if kind == AttachmentType::Template {
            return Err(Error::invalid_input(
                "template attachments need a template payload, not a URL",
            ));
        }
        Ok(self.structured(StructuredMessageAttachment::from_url(kind, url), options))
    }

    /// Upload raw bytes. The advertised content type is sniffed from the
    /// payload; `filename` is passed through as-is.
    pub fn attachment_data(
        &self,
        kind: AttachmentType,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<Envelope> {
        if kind == AttachmentType::Template {
            return Err(Error::invalid_input("template attachments cannot be uploaded"));
        }
        let data = data.into();
        let filename = filename.into();
        let content_type = sniff::sniff_content_type(&data);
        debug!(%filename, content_type, size = data.len(), "content type detected");
        Ok(Envelope::Upload(AttachmentUpload {
            recipient: self.to.clone(),
            kind,
            filename,
            content_type,
            data,
        }))
    }

    /// Encode `img` as JPEG and upload it.
    pub fn image(&self, img: &DynamicImage) -> Result<Envelope> {
        let data = media::encode_jpeg(img)?;
        self.attachment_data(AttachmentType::Image, IMAGE_FILENAME, data)
    }

    pub fn button_template(
        &self,
        text: impl Into<String>,
        buttons: Vec<StructuredMessageButton>,
        options: &SendOptions,
    ) -> Envelope {
        self.template(
            TemplatePayload::Button {
                text: text.into(),
                buttons,
            },
            options,
        )
    }

    pub fn generic_template(
        &self,
        elements: Vec<StructuredMessageElement>,
        options: &SendOptions,
    ) -> Envelope {
        self.template(
            TemplatePayload::Generic {
                elements,
                image_aspect_ratio: None,
                sharable: false,
            },
            options,
        )
    }

    pub fn list_template(
        &self,
        elements: Vec<StructuredMessageElement>,
        options: &SendOptions,
    ) -> Envelope {
        self.template(
            TemplatePayload::List {
                top_element_style: Some(TopElementStyle::Compact),
                elements,
                buttons: Vec::new(),
            },
            options,
        )
    }

    pub fn receipt_template(&self, receipt: ReceiptPayload, options: &SendOptions) -> Envelope {
        self.template(TemplatePayload::Receipt(Box::new(receipt)), options)
    }

    pub fn template(&self, payload: TemplatePayload, options: &SendOptions) -> Envelope {
        self.structured(StructuredMessageAttachment::template(payload), options)
    }

    pub fn sender_action(&self, action: SenderAction) -> Envelope {
        Envelope::SenderAction(SendSenderAction {
            recipient: self.to.clone(),
            sender_action: action,
            payload: None,
        })
    }

    /// React to `message_id` with `reaction` (e.g. "love").
    pub fn react(&self, message_id: impl Into<String>, reaction: impl Into<String>) -> Envelope {
        Envelope::SenderAction(SendSenderAction {
            recipient: self.to.clone(),
            sender_action: SenderAction::React,
            payload: Some(SenderActionPayload {
                message_id: message_id.into(),
                reaction: Some(reaction.into()),
            }),
        })
    }

    pub fn unreact(&self, message_id: impl Into<String>) -> Envelope {
        Envelope::SenderAction(SendSenderAction {
            recipient: self.to.clone(),
            sender_action: SenderAction::Unreact,
            payload: Some(SenderActionPayload {
                message_id: message_id.into(),
                reaction: None,
            }),
        })
    }

    /// Handover request passing the thread to the page inbox app
    /// (usually `INBOX_APP_ID`, overridable through config).
    pub fn pass_thread_to_inbox(&self, inbox_app_id: i64) -> PassThreadControl {
        self.pass_thread_control(inbox_app_id, INBOX_HANDOVER_METADATA)
    }

    /// Handover request passing the thread to `target_app_id`.
    pub fn pass_thread_control(
        &self,
        target_app_id: i64,
        metadata: impl Into<String>,
    ) -> PassThreadControl {
        PassThreadControl {
            recipient: self.to.clone(),
            target_app_id,
            metadata: metadata.into(),
        }
    }

    fn message(&self, message: MessageData, options: &SendOptions) -> Envelope {
        Envelope::Message(SendMessage {
            messaging_type: options.messaging_type,
            recipient: self.to.clone(),
            message,
            tag: options.tag.clone(),
            thread_control: options.thread_control,
        })
    }

    fn structured(&self, attachment: StructuredMessageAttachment, options: &SendOptions) -> Envelope {
        Envelope::Structured(SendStructuredMessage {
            messaging_type: options.messaging_type,
            recipient: self.to.clone(),
            message: StructuredMessageData {
                attachment,
                metadata: options.metadata.clone(),
            },
            tag: options.tag.clone(),
            thread_control: options.thread_control,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        messenger_protocol::send::{INBOX_APP_ID, Summary},
        serde_json::json,
    };

    fn builder() -> MessageBuilder {
        MessageBuilder::new(Recipient::new(154))
    }

    fn json_of(envelope: &Envelope) -> serde_json::Value {
        serde_json::from_slice(&envelope.to_json().unwrap().unwrap()).unwrap()
    }

    #[test]
    fn text_serializes_minimal_envelope() {
        let envelope = builder().text("hi", &SendOptions::response());
        assert_eq!(
            String::from_utf8(envelope.to_json().unwrap().unwrap()).unwrap(),
            r#"{"messaging_type":"RESPONSE","recipient":{"id":"154"},"message":{"text":"hi"}}"#
        );
    }

    #[test]
    fn message_tag_uses_first_tag() {
        let options = SendOptions::new(MessagingType::MessageTag)
            .with_tags(["CONFIRMED_EVENT_UPDATE", "ACCOUNT_UPDATE"]);
        let value = json_of(&builder().text("event moved", &options));
        assert_eq!(value["messaging_type"], "MESSAGE_TAG");
        assert_eq!(value["tag"], "CONFIRMED_EVENT_UPDATE");
    }

    #[test]
    fn message_tag_without_tags_leaves_tag_empty() {
        let options = SendOptions::new(MessagingType::MessageTag).with_tags(Vec::<String>::new());
        let value = json_of(&builder().text("hi", &options));
        assert_eq!(value["messaging_type"], "MESSAGE_TAG");
        assert!(value.get("tag").is_none());
    }

    #[test]
    fn text_with_replies_keeps_order_and_metadata() {
        let replies = vec![QuickReply::text("Red", "RED"), QuickReply::text("Green", "GREEN")];
        let options = SendOptions::new(MessagingType::Update).with_metadata("dev-meta");
        let value = json_of(&builder().text_with_replies("Pick a color", replies, &options));
        assert_eq!(
            value["message"],
            json!({
                "text": "Pick a color",
                "metadata": "dev-meta",
                "quick_replies": [
                    {"content_type": "text", "title": "Red", "payload": "RED"},
                    {"content_type": "text", "title": "Green", "payload": "GREEN"}
                ]
            })
        );
    }

    #[test]
    fn attachment_by_url() {
        let envelope = builder()
            .attachment(
                AttachmentType::Video,
                "https://example.com/v.mp4",
                &SendOptions::default(),
            )
            .unwrap();
        assert_eq!(
            json_of(&envelope)["message"],
            json!({"attachment": {"type": "video", "payload": {"url": "https://example.com/v.mp4"}}})
        );
    }

    #[test]
    fn template_attachment_by_url_is_rejected() {
        let err = builder()
            .attachment(AttachmentType::Template, "https://x", &SendOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn attachment_data_sniffs_jpeg_regardless_of_filename() {
        let jpeg: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x00];
        let envelope = builder()
            .attachment_data(AttachmentType::Image, "photo.png", jpeg.clone())
            .unwrap();
        let Envelope::Upload(upload) = &envelope else {
            panic!("expected upload, got {envelope:?}");
        };
        assert_eq!(upload.content_type, "image/jpeg");
        assert_eq!(upload.filename, "photo.png");
        assert_eq!(&upload.data[..], jpeg.as_slice());
        assert_eq!(upload.recipient_field().unwrap(), r#"{"id":"154"}"#);
        assert_eq!(
            upload.message_field().unwrap(),
            r#"{"attachment":{"type":"image","payload":{}}}"#
        );
        assert!(envelope.to_json().unwrap().is_none());
    }

    #[test]
    fn image_is_uploaded_as_jpeg() {
        let img = DynamicImage::new_rgb8(2, 2);
        let Envelope::Upload(upload) = builder().image(&img).unwrap() else {
            panic!("expected upload");
        };
        assert_eq!(upload.kind, AttachmentType::Image);
        assert_eq!(upload.filename, "image.jpg");
        assert_eq!(upload.content_type, "image/jpeg");
    }

    #[test]
    fn button_template_envelope() {
        let options = SendOptions::default().with_metadata("m");
        let value = json_of(&builder().button_template(
            "What next?",
            vec![StructuredMessageButton::postback("Start", "START")],
            &options,
        ));
        assert_eq!(
            value,
            json!({
                "messaging_type": "RESPONSE",
                "recipient": {"id": "154"},
                "message": {
                    "metadata": "m",
                    "attachment": {
                        "type": "template",
                        "payload": {
                            "template_type": "button",
                            "text": "What next?",
                            "buttons": [{"type": "postback", "title": "Start", "payload": "START"}]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn generic_and_list_templates_keep_element_order() {
        let elements = vec![
            StructuredMessageElement::new("first"),
            StructuredMessageElement::new("second"),
        ];
        let generic = json_of(&builder().generic_template(elements.clone(), &SendOptions::default()));
        let payload = &generic["message"]["attachment"]["payload"];
        assert_eq!(payload["template_type"], "generic");
        assert_eq!(payload["elements"][0]["title"], "first");
        assert_eq!(payload["elements"][1]["title"], "second");

        let list = json_of(&builder().list_template(elements, &SendOptions::default()));
        let payload = &list["message"]["attachment"]["payload"];
        assert_eq!(payload["template_type"], "list");
        assert_eq!(payload["top_element_style"], "compact");
        assert!(payload.get("buttons").is_none());
    }

    #[test]
    fn receipt_template_envelope() {
        let receipt = ReceiptPayload {
            recipient_name: "Jo".into(),
            order_number: "42".into(),
            currency: "EUR".into(),
            payment_method: "Visa 1234".into(),
            summary: Summary {
                total_cost: 10.5,
                ..Summary::default()
            },
            ..ReceiptPayload::default()
        };
        let value = json_of(&builder().receipt_template(receipt, &SendOptions::default()));
        let payload = &value["message"]["attachment"]["payload"];
        assert_eq!(payload["template_type"], "receipt");
        assert_eq!(payload["summary"]["total_cost"], 10.5);
    }

    #[test]
    fn sender_actions() {
        assert_eq!(
            json_of(&builder().sender_action(SenderAction::TypingOn)),
            json!({"recipient": {"id": "154"}, "sender_action": "TYPING_ON"})
        );
        assert_eq!(
            json_of(&builder().unreact("m_1")),
            json!({"recipient": {"id": "154"}, "sender_action": "UNREACT", "payload": {"message_id": "m_1"}})
        );
    }

    #[test]
    fn thread_control_request() {
        let request = builder().pass_thread_to_inbox(INBOX_APP_ID);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "recipient": {"id": "154"},
                "target_app_id": 263_902_037_430_900_i64,
                "metadata": "Passing to inbox secondary app"
            })
        );
    }

    #[test]
    fn thread_control_to_other_app_carries_caller_metadata() {
        let request = builder().pass_thread_control(1_234, "escalate to billing");
        assert_eq!(request.target_app_id, 1_234);
        assert_eq!(request.metadata, "escalate to billing");

        let inbox = builder().pass_thread_to_inbox(42);
        assert_eq!(inbox.target_app_id, 42);
        assert_eq!(inbox.metadata, "Passing to inbox secondary app");
    }

    #[test]
    fn building_does_not_touch_builder_state() {
        let builder = builder();
        let before = builder.clone();
        let _ = builder.text("a", &SendOptions::default());
        let _ = builder.sender_action(SenderAction::MarkSeen);
        assert_eq!(builder, before);
    }
}
