//! Toolsmith: a reasoning/acting agent that answers questions by calling
//! registered tools.
//!
//! The agent asks a chat model for one JSON decision at a time, runs the
//! chosen tool, feeds the observation back, and stops on a final answer,
//! a repeated identical call, or an exhausted iteration budget. Finished
//! questions are kept as compressed conversation history.

pub mod agent;
pub mod config;
pub mod error;
pub mod inference;
pub mod state;
pub mod tools;
pub mod types;
