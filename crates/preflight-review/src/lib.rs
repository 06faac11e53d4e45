//! Review pipeline: from a change to decoded findings.
//!
//! Provides prompt construction, generation sources (streaming LLM client
//! and canned replay), incremental record extraction, decoding, change
//! retrieval, and the downstream sinks (SQLite store, HTML report,
//! desktop notification).

pub mod decoder;
pub mod extract;
pub mod git;
pub mod llm;
pub mod notify;
pub mod prompt;
pub mod report;
pub mod source;
pub mod store;
