//! Message admission and streaming orchestration.
//!
//! An inbound message passes an ordered [`AdmissionPipeline`]; the terminal
//! dispatch stage hands it to the [`Orchestrator`], which streams the AI reply
//! into an editable card and commits the exchange to the session store.

pub mod admission;
pub mod callback;
pub mod commands;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod orchestrator;
pub mod replies;

pub use {
    admission::{AdmissionFilter, AdmissionPipeline},
    callback::{CallbackAction, CallbackChain, CallbackVerdict},
    engine::{ChatEngine, ChatSettings},
    error::{Error, Result},
    exchange::{Exchange, ExchangeOutcome, ExchangeState},
    orchestrator::{Orchestrator, OrchestratorConfig},
    replies::Replies,
};
