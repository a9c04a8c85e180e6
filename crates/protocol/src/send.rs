//! Outbound payloads for the send API.

use serde::{Deserialize, Serialize};

use crate::{
    error::{UnmarshalError, from_json_slice},
    receive::{QuickReply, Recipient},
};

/// Graph API page that owns the "Inbox" secondary receiver for the handover
/// protocol.
pub const INBOX_APP_ID: i64 = 263_902_037_430_900;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Why a message is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagingType {
    /// Reply inside the standard messaging window.
    Response,
    /// Proactive update inside the standard messaging window.
    Update,
    /// Outside the window, justified by a message tag.
    MessageTag,
    NonPromotionalSubscription,
}

impl MessagingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "RESPONSE",
            Self::Update => "UPDATE",
            Self::MessageTag => "MESSAGE_TAG",
            Self::NonPromotionalSubscription => "NON_PROMOTIONAL_SUBSCRIPTION",
        }
    }
}

impl std::fmt::Display for MessagingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Image,
    Audio,
    Video,
    File,
    Template,
}

impl AttachmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
            Self::Template => "template",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopElementStyle {
    #[default]
    Compact,
    Large,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAspectRatio {
    /// 1.91:1
    #[default]
    Horizontal,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonType {
    WebUrl,
    Postback,
    PhoneNumber,
    ElementShare,
    AccountLink,
    AccountUnlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebviewHeightRatio {
    Compact,
    Tall,
    Full,
}

/// Ephemeral UI signal sent instead of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
    React,
    Unreact,
}

/// Directive attached to a message to hand the thread over in the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadControl {
    pub payload: ThreadControlPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadControlPayload {
    PassThreadControl,
}

impl ThreadControl {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            payload: ThreadControlPayload::PassThreadControl,
        }
    }
}

/// Text or attachment message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub messaging_type: MessagingType,
    pub recipient: Recipient,
    pub message: MessageData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_control: Option<ThreadControl>,
}

/// Message body. Exactly one of `text` or `attachment` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<StructuredMessageAttachment>,
    /// Display order is preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Template or URL attachment envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendStructuredMessage {
    pub messaging_type: MessagingType,
    pub recipient: Recipient,
    pub message: StructuredMessageData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_control: Option<ThreadControl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredMessageData {
    pub attachment: StructuredMessageAttachment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredMessageAttachment {
    #[serde(rename = "type")]
    pub kind: AttachmentType,
    pub payload: StructuredMessagePayload,
}

impl StructuredMessageAttachment {
    /// Media attachment fetched by the platform from `url`.
    #[must_use]
    pub fn from_url(kind: AttachmentType, url: impl Into<String>) -> Self {
        Self {
            kind,
            payload: StructuredMessagePayload::Media(MediaPayload {
                url: Some(url.into()),
                ..MediaPayload::default()
            }),
        }
    }

    #[must_use]
    pub fn template(payload: TemplatePayload) -> Self {
        Self {
            kind: AttachmentType::Template,
            payload: StructuredMessagePayload::Template(payload),
        }
    }
}

/// Attachment payload: a template (tagged by `template_type`) or a media
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredMessagePayload {
    Template(TemplatePayload),
    Media(MediaPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// ID of a previously uploaded reusable attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reusable: Option<bool>,
}

/// Template payloads. Each template requires a different subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum TemplatePayload {
    Button {
        text: String,
        buttons: Vec<StructuredMessageButton>,
    },
    Generic {
        elements: Vec<StructuredMessageElement>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_aspect_ratio: Option<ImageAspectRatio>,
        #[serde(default, skip_serializing_if = "is_false")]
        sharable: bool,
    },
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_element_style: Option<TopElementStyle>,
        elements: Vec<StructuredMessageElement>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        buttons: Vec<StructuredMessageButton>,
    },
    Receipt(Box<ReceiptPayload>),
}

/// Order confirmation template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub recipient_name: String,
    pub order_number: String,
    pub currency: String,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_url: Option<String>,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<StructuredMessageElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<Adjustment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sharable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tax: Option<f64>,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub name: String,
    pub amount: f64,
}

/// Card in a generic, list or receipt template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredMessageElement {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<DefaultAction>,
    /// Display order is preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<StructuredMessageButton>,
    // Receipt line-item fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl StructuredMessageElement {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Action taken when the element itself is tapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAction {
    #[serde(rename = "type")]
    pub kind: ButtonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_height_ratio: Option<WebviewHeightRatio>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub messenger_extensions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_share_button: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredMessageButton {
    #[serde(rename = "type")]
    pub kind: ButtonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_height_ratio: Option<WebviewHeightRatio>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub messenger_extensions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webview_share_button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_contents: Option<Box<StructuredMessageData>>,
}

impl StructuredMessageButton {
    fn bare(kind: ButtonType) -> Self {
        Self {
            kind,
            url: None,
            title: None,
            payload: None,
            webview_height_ratio: None,
            messenger_extensions: false,
            fallback_url: None,
            webview_share_button: None,
            share_contents: None,
        }
    }

    #[must_use]
    pub fn web_url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
            ..Self::bare(ButtonType::WebUrl)
        }
    }

    #[must_use]
    pub fn postback(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            payload: Some(payload.into()),
            ..Self::bare(ButtonType::Postback)
        }
    }

    /// `number` must be in `+<country><number>` form.
    #[must_use]
    pub fn phone_number(title: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            payload: Some(number.into()),
            ..Self::bare(ButtonType::PhoneNumber)
        }
    }

    #[must_use]
    pub fn account_link(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::bare(ButtonType::AccountLink)
        }
    }

    #[must_use]
    pub fn account_unlink() -> Self {
        Self::bare(ButtonType::AccountUnlink)
    }
}

/// Sender action envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSenderAction {
    pub recipient: Recipient,
    pub sender_action: SenderAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<SenderActionPayload>,
}

/// Target of a `react`/`unreact` sender action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderActionPayload {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
}

/// Handover protocol request passing thread ownership to another app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThreadControl {
    pub recipient: Recipient,
    pub target_app_id: i64,
    #[serde(default)]
    pub metadata: String,
}

/// Send API acknowledgement. `error` is set when the request failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::QueryError>,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub message_id: String,
}

impl QueryResponse {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, UnmarshalError> {
        from_json_slice(bytes)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[rstest]
    #[case(SenderAction::MarkSeen, "MARK_SEEN")]
    #[case(SenderAction::TypingOn, "TYPING_ON")]
    #[case(SenderAction::TypingOff, "TYPING_OFF")]
    #[case(SenderAction::React, "REACT")]
    #[case(SenderAction::Unreact, "UNREACT")]
    fn sender_action_wire_values(#[case] action: SenderAction, #[case] wire: &str) {
        assert_eq!(serde_json::to_value(action).unwrap(), json!(wire));
        assert_eq!(
            serde_json::from_value::<SenderAction>(json!(wire)).unwrap(),
            action
        );
    }

    #[test]
    fn send_message_with_thread_control() {
        let message = SendMessage {
            messaging_type: MessagingType::Response,
            recipient: Recipient::default(),
            message: MessageData {
                text: Some("Hello World".into()),
                ..MessageData::default()
            },
            tag: None,
            thread_control: Some(ThreadControl::pass()),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "messaging_type": "RESPONSE",
                "recipient": {},
                "message": {"text": "Hello World"},
                "thread_control": {"payload": "pass_thread_control"}
            })
        );
    }

    #[test]
    fn element_omits_unset_fields() {
        let element = StructuredMessageElement::new("Title");
        assert_eq!(
            serde_json::to_value(&element).unwrap(),
            json!({"title": "Title"})
        );
    }

    #[test]
    fn button_template_is_tagged_by_template_type() {
        let attachment = StructuredMessageAttachment::template(TemplatePayload::Button {
            text: "Pick one".into(),
            buttons: vec![
                StructuredMessageButton::postback("Yes", "YES"),
                StructuredMessageButton::web_url("Docs", "https://example.com"),
            ],
        });
        assert_eq!(
            serde_json::to_value(&attachment).unwrap(),
            json!({
                "type": "template",
                "payload": {
                    "template_type": "button",
                    "text": "Pick one",
                    "buttons": [
                        {"type": "postback", "title": "Yes", "payload": "YES"},
                        {"type": "web_url", "title": "Docs", "url": "https://example.com"}
                    ]
                }
            })
        );
    }

    #[test]
    fn structured_payload_decodes_each_shape() {
        let media: StructuredMessagePayload =
            serde_json::from_value(json!({"url": "https://example.com/a.mp3"})).unwrap();
        assert!(matches!(media, StructuredMessagePayload::Media(ref m) if m.url.is_some()));

        let list: StructuredMessagePayload = serde_json::from_value(json!({
            "template_type": "list",
            "top_element_style": "compact",
            "elements": [{"title": "a"}, {"title": "b"}]
        }))
        .unwrap();
        match list {
            StructuredMessagePayload::Template(TemplatePayload::List { elements, .. }) => {
                let titles: Vec<_> = elements.iter().map(|e| e.title.as_str()).collect();
                assert_eq!(titles, ["a", "b"]);
            },
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn unknown_template_type_is_rejected() {
        let result = serde_json::from_value::<StructuredMessagePayload>(json!({
            "template_type": "carousel",
            "elements": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_messaging_type_is_rejected() {
        assert!(serde_json::from_str::<MessagingType>(r#""PROMOTIONAL""#).is_err());
        assert_eq!(
            serde_json::from_str::<MessagingType>(r#""NON_PROMOTIONAL_SUBSCRIPTION""#).unwrap(),
            MessagingType::NonPromotionalSubscription
        );
    }

    #[test]
    fn receipt_template_serializes_flat() {
        let payload = TemplatePayload::Receipt(Box::new(ReceiptPayload {
            recipient_name: "Stephane Crozatier".into(),
            order_number: "12345678902".into(),
            currency: "USD".into(),
            payment_method: "Visa 2345".into(),
            summary: Summary {
                total_cost: 56.14,
                ..Summary::default()
            },
            ..ReceiptPayload::default()
        }));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["template_type"], "receipt");
        assert_eq!(value["order_number"], "12345678902");
        assert_eq!(value["summary"], json!({"total_cost": 56.14}));
        assert!(value.get("elements").is_none());
    }

    #[test]
    fn sender_action_with_reaction() {
        let action = SendSenderAction {
            recipient: Recipient::new(154),
            sender_action: SenderAction::React,
            payload: Some(SenderActionPayload {
                message_id: "m_1".into(),
                reaction: Some("love".into()),
            }),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "recipient": {"id": "154"},
                "sender_action": "REACT",
                "payload": {"message_id": "m_1", "reaction": "love"}
            })
        );
    }

    #[test]
    fn query_response_decodes_error_envelope() {
        let response = QueryResponse::from_slice(
            br#"{"error":{"message":"boom","type":"OAuthException","code":190,"fbtrace_id":"x"}}"#,
        )
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.message, "boom");
        assert_eq!(error.error_subcode, 0);
        assert!(response.message_id.is_empty());
    }
}
