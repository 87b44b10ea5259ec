//! Gradebook - answer-sheet extraction and evaluation service.
//!
//! Users upload a knowledge-base PDF together with scanned or typed answer
//! sheets. Answer text is pulled directly from the PDF where possible, the
//! remaining pages are sent to a vision model in small batches, and the
//! combined answer is scored against the knowledge base by the same model.

pub mod auth;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod storage;
