//! Messenger platform wire protocol.
//!
//! Typed shapes for the webhook payloads the platform delivers and for the
//! send API envelopes it accepts, plus classification of webhook events into
//! a closed set of kinds. Pure data: nothing here performs I/O.
//!
//! - [`receive`]: inbound webhook payloads (`Receive` → `Entry` → `MessageInfo`)
//! - [`action`]: event classification (`MessageInfo` → `InboundEvent`)
//! - [`send`]: outbound envelopes and the `QueryResponse` acknowledgement
//! - [`error`]: decode failures and the remote error envelope

pub mod action;
pub mod error;
pub mod id;
pub mod receive;
pub mod send;

pub use {
    action::{Action, EventKind, InboundEvent},
    error::{QueryError, UnmarshalError},
    receive::{MessageInfo, Receive, Recipient, Sender},
    send::{MessagingType, QueryResponse},
};
