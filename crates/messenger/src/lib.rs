//! Messenger platform client.
//!
//! Builds send API envelopes, dispatches them over HTTP and unwraps the
//! platform's response, and turns webhook bodies into classified events.
//! Wire types live in `messenger-protocol`.

pub mod builder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod response;
pub mod sniff;
pub mod transport;
pub mod webhook;

pub use {
    builder::{Envelope, MessageBuilder, SendOptions},
    config::MessengerConfig,
    dispatch::Dispatcher,
    error::{Error, Result},
    response::{Messenger, Response},
    transport::{ReqwestTransport, Transport},
};
