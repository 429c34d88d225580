//! Interactive, in-process debugger for a build-execution engine.
//!
//! The engine calls [`debugger::Debugger::offer_stop`] at each potential
//! stop point in its recursive target evaluation and acts on the
//! [`debugger::ControlSignal`] it gets back. A minimal reference engine
//! lives under [`engine`] to drive the binary and the integration tests.

pub mod debugger;
pub mod engine;
