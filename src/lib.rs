//! Subfuse - streaming subtitle transcription and translation
//!
//! Downloads a video's audio, transcribes it through an OpenAI-compatible
//! model API, translates the cues in concurrent batches and streams progress
//! as newline-delimited JSON. Finished documents are kept in a bounded
//! in-memory cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod progress;
pub mod provider;
pub mod server;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
