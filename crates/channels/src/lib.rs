//! IM platform abstractions.
//!
//! A platform adapter turns its wire events into [`InboundMessage`] and
//! [`CardCallback`] values and implements [`CardSink`] (editable streaming
//! cards) and [`CardReplier`] (static reply cards).

pub mod card;
pub mod error;
pub mod gating;
pub mod message;
pub mod normalize;
pub mod plugin;

pub use {
    card::{ButtonStyle, CardElement, HeaderTemplate, StaticCard, StreamUpdate},
    error::{Error, Result},
    message::{CardCallback, ChatKind, InboundMessage, Mention},
    plugin::{CardReplier, CardSink},
};
