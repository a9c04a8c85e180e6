//! Classification of webhook events.
//!
//! The wire format marks the kind of an event only by which optional
//! sub-payload is present. Classification happens once, right after decode,
//! using a fixed priority order (first match wins):
//!
//! 1. `message` → [`Action::Text`]
//! 2. `delivery` → [`Action::Delivery`]
//! 3. `read` → [`Action::Read`]
//! 4. `postback` → [`Action::PostBack`]
//! 5. `optin` → [`Action::OptIn`]
//! 6. `referral` → [`Action::Referral`]
//! 7. `account_linking` → [`Action::AccountLinking`]
//! 8. nothing → [`Action::Unknown`]
//!
//! Downstream consumers rely on this order; changing it is a breaking change.

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

use crate::receive::{
    AccountLinking, Delivery, Message, MessageInfo, OptIn, PostBack, Read, Recipient, Referral,
    Sender,
};

/// Kind of a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// A message, possibly with attachments.
    Text,
    /// Previously sent messages were delivered.
    Delivery,
    /// Previously sent messages were read.
    Read,
    /// A postback button was clicked.
    PostBack,
    /// Opt-in through the "Send to Messenger" plugin.
    OptIn,
    /// `?ref=` parameter on an m.me link, ad or chat plugin.
    Referral,
    /// Account linking status changed.
    AccountLinking,
    /// None of the recognised sub-payloads was present.
    Unknown,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Delivery => "delivery",
            Self::Read => "read",
            Self::PostBack => "post_back",
            Self::OptIn => "opt_in",
            Self::Referral => "referral",
            Self::AccountLinking => "account_linking",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified event payload. Exactly one variant per event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Text(Message),
    Delivery(Delivery),
    Read(Read),
    PostBack(PostBack),
    OptIn(OptIn),
    Referral(Referral),
    AccountLinking(AccountLinking),
    Unknown,
}

impl EventKind {
    pub fn action(&self) -> Action {
        match self {
            Self::Text(_) => Action::Text,
            Self::Delivery(_) => Action::Delivery,
            Self::Read(_) => Action::Read,
            Self::PostBack(_) => Action::PostBack,
            Self::OptIn(_) => Action::OptIn,
            Self::Referral(_) => Action::Referral,
            Self::AccountLinking(_) => Action::AccountLinking,
            Self::Unknown => Action::Unknown,
        }
    }
}

/// A webhook event after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub sender: Sender,
    pub recipient: Recipient,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn action(&self) -> Action {
        self.kind.action()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Recipient to use when answering this event.
    pub fn reply_recipient(&self) -> Recipient {
        Recipient::from(self.sender)
    }
}

impl MessageInfo {
    /// Classify this event. See the module docs for the priority order.
    pub fn action(&self) -> Action {
        if self.message.is_some() {
            Action::Text
        } else if self.delivery.is_some() {
            Action::Delivery
        } else if self.read.is_some() {
            Action::Read
        } else if self.postback.is_some() {
            Action::PostBack
        } else if self.optin.is_some() {
            Action::OptIn
        } else if self.referral.is_some() {
            Action::Referral
        } else if self.account_linking.is_some() {
            Action::AccountLinking
        } else {
            Action::Unknown
        }
    }

    /// Number of classifiable sub-payloads present. More than one means the
    /// priority order had to break a tie.
    pub fn populated_payloads(&self) -> usize {
        [
            self.message.is_some(),
            self.delivery.is_some(),
            self.read.is_some(),
            self.postback.is_some(),
            self.optin.is_some(),
            self.referral.is_some(),
            self.account_linking.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    /// Consume the event, keeping only the sub-payload that wins
    /// classification.
    pub fn into_event(self) -> InboundEvent {
        let kind = match self.action() {
            Action::Text => self.message.map(EventKind::Text),
            Action::Delivery => self.delivery.map(EventKind::Delivery),
            Action::Read => self.read.map(EventKind::Read),
            Action::PostBack => self.postback.map(EventKind::PostBack),
            Action::OptIn => self.optin.map(EventKind::OptIn),
            Action::Referral => self.referral.map(EventKind::Referral),
            Action::AccountLinking => self.account_linking.map(EventKind::AccountLinking),
            Action::Unknown => None,
        }
        .unwrap_or(EventKind::Unknown);

        InboundEvent {
            sender: self.sender,
            recipient: self.recipient,
            timestamp: self.timestamp,
            kind,
        }
    }
}
