//! Threadwise: Slack thread classification and summarization service.
//!
//! Scans configured channels for active threads, classifies each thread
//! with an LLM, posts a block-formatted summary back into the thread,
//! and files Jira tickets for extracted action items. Analysis cycles run
//! on a cron schedule through either a direct loopback call or isolated
//! Kubernetes Jobs.

pub mod analysis;
pub mod clients;
pub mod config;
pub mod cron;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod server;
pub mod workspace;

pub use error::{Error, Result};
