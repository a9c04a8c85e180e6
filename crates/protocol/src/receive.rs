//! Inbound webhook payloads.
//!
//! Shapes follow the platform's JSON field-for-field. Fields the platform may
//! omit decode to `None` or an empty collection and are omitted again when
//! re-encoded, so a decode/encode pass does not invent zero values.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
};

use crate::error::{UnmarshalError, from_json_slice};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Top-level webhook body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receive {
    /// `page` for Messenger, `instagram` for Instagram messaging.
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl Receive {
    /// Decode a raw webhook body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, UnmarshalError> {
        from_json_slice(bytes)
    }
}

/// A batch of events delivered in one webhook call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(with = "crate::id::string")]
    pub id: i64,
    /// Epoch milliseconds.
    pub time: i64,
    #[serde(default)]
    pub messaging: Vec<MessageInfo>,
}

/// A single webhook event. The platform fills in at most one of the optional
/// sub-payloads, but does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub sender: Sender,
    pub recipient: Recipient,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Read>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<PostBack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optin: Option<OptIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_linking: Option<AccountLinking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<IgMessageReaction>,
}

impl MessageInfo {
    /// Event time as a UTC datetime.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Who the event was sent from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sender {
    #[serde(with = "crate::id::string")]
    pub id: i64,
}

/// Who the event was sent to. Outbound messages may target a post or comment
/// instead of a user ID (private replies).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(
        default,
        with = "crate::id::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
}

impl Recipient {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn post(post_id: impl Into<String>) -> Self {
        Self {
            post_id: Some(post_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn comment(comment_id: impl Into<String>) -> Self {
        Self {
            comment_id: Some(comment_id.into()),
            ..Self::default()
        }
    }
}

impl From<Sender> for Recipient {
    fn from(sender: Sender) -> Self {
        Self::new(sender.id)
    }
}

/// An inbound message. Text, attachments and stickers share this shape; the
/// `read`, `reaction`, `referral`, `reply_to`, `is_unsupported` and
/// `is_deleted` fields only appear on Instagram webhooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_echo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Display order is preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReply>,
    /// Built-in NLP entities, kept raw. See [`Message::nlp`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlp: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<IgMessageRead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<IgMessageReaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<IgMessageReferral>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_unsupported: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<IgReplyTo>,
}

impl Message {
    /// Decode the NLP entities into a caller-defined shape. Returns `Ok(None)`
    /// when the message carried no NLP block.
    pub fn nlp<T: DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        self.nlp
            .as_ref()
            .map(|value| T::deserialize(value))
            .transpose()
    }
}

/// Delivery receipt for previously sent messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mids: Vec<String>,
    /// Epoch milliseconds; everything sent before it was delivered.
    pub watermark: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
}

impl Delivery {
    pub fn watermark_time(&self) -> Option<DateTime<Utc>> {
        watermark_to_time(self.watermark)
    }
}

/// Read receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Read {
    /// Epoch milliseconds; everything sent before it was read.
    #[serde(default)]
    pub watermark: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
}

impl Read {
    pub fn watermark_time(&self) -> Option<DateTime<Utc>> {
        watermark_to_time(self.watermark)
    }
}

// Watermarks have second precision on the platform side.
fn watermark_to_time(watermark: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(watermark / 1000, 0)
}

/// Postback button click.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostBack {
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
    /// Title of the CTA that was clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
}

/// Opt-in through the "Send to Messenger" plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptIn {
    #[serde(default, rename = "ref")]
    pub reference: String,
}

/// Referral info (`?ref=` on m.me links, ads, chat plugin).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ads_context_data: Option<AdsContextData>,
    /// Site the chat plugin message was sent from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer_uri: Option<String>,
}

/// Click-to-Messenger ad the user started the thread from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsContextData {
    #[serde(default)]
    pub ad_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// Account linking status change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountLinking {
    /// `linked` or `unlinked`.
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgMessageRead {
    #[serde(default)]
    pub mid: String,
}

/// Reaction to an Instagram message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgMessageReaction {
    #[serde(default)]
    pub mid: String,
    /// `react` or `unreact`.
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgMessageProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgMessageReferral {
    #[serde(default)]
    pub product: IgMessageProduct,
}

/// What an Instagram message replied to: a message or a story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgReplyTo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<IgReplyToStory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgReplyToStory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A file or rich payload attached to an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `image`, `video`, `audio`, `file`, `location`, `fallback`, `template`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Payload,
}

/// Attachment payload. The wire format has no discriminant; use
/// [`Payload::shape`] to find out what it holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<i64>,
}

/// Field-presence view of a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadShape<'a> {
    Template {
        template_type: &'a str,
        buttons: &'a [Button],
    },
    Location(&'a Coordinates),
    Url(&'a str),
    Empty,
}

impl Payload {
    /// Classify the payload by which fields are populated. A template type
    /// wins over coordinates, which win over a bare URL.
    pub fn shape(&self) -> PayloadShape<'_> {
        if let Some(template_type) = self.template_type.as_deref() {
            return PayloadShape::Template {
                template_type,
                buttons: &self.buttons,
            };
        }
        if let Some(coordinates) = &self.coordinates {
            return PayloadShape::Location(coordinates);
        }
        match self.url.as_deref() {
            Some(url) => PayloadShape::Url(url),
            None => PayloadShape::Empty,
        }
    }
}

/// Latitude/longitude of a shared location pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

/// Quick reply, both as offered (outbound) and as selected (inbound, where
/// only `payload` is set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<QuickReplyContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl QuickReply {
    /// A plain text quick reply.
    #[must_use]
    pub fn text(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            content_type: Some(QuickReplyContentType::Text),
            title: Some(title.into()),
            payload: payload.into(),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickReplyContentType {
    Text,
    UserPhoneNumber,
    UserEmail,
}

/// Button carried by an inbound template attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_height_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub messenger_extensions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_share_button: Option<String>,
}
