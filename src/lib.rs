//! # crop-search
//!
//! A small web application for farmers and extension officers: type a
//! question about a crop pest or disease, get the most similar passages from
//! a prebuilt document index, and watch a summary stream in with links to
//! reference images for every pest it names.
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────┐
//!        │ Query + top-k + language     │
//!        └──────────────┬───────────────┘
//!                       │ translate → English (optional)
//!                       ▼
//!        ┌──────────────────────────────┐
//!        │ Retriever                    │
//!        │ hosted embedding + cosine    │
//!        │ search over vectors.json     │
//!        └──────────────┬───────────────┘
//!                       │ top-k passages (SSE `passages`)
//!                       ▼
//!        ┌──────────────────────────────┐
//!        │ Chat completion (streamed)   │
//!        │ system + user prompt, top 3  │
//!        └──────────────┬───────────────┘
//!                       │ fragments … end marker
//!                       ▼
//!        ┌──────────────────────────────┐
//!        │ Incremental annotator        │
//!        │ leftmost-longest phrase      │
//!        │ → markdown link              │
//!        └──────────────┬───────────────┘
//!                       │ SSE `partial` × n, `final`
//!                       ▼
//!        ┌──────────────────────────────┐
//!        │ Translation / narration      │
//!        │ (optional, hosted)           │
//!        └──────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, index and hosted services
//! - [`error`] - Request preconditions (`top_k` range, passage count, disabled speech)
//! - [`models`] - Shared data types: `RetrievedPassage`, request/response types
//! - [`search::vector`] - Prebuilt passage index with cosine similarity search
//! - [`retrieval`] - `Retriever` adapter: embed the query, rank the index
//! - [`llm::embeddings`] - Query embeddings via Ollama or OpenAI-compatible APIs
//! - [`llm::chat_stream`] - Streamed chat completions decoded into fragments and an end marker
//! - [`summary`] - Prompt building, keyword link table and the incremental annotator
//! - [`services`] - Google translation and text-to-speech clients
//! - [`api`] - Axum HTTP handlers for search, streamed summary, translation and speech
//! - [`state`] - Shared application state holding the injected service handles

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod retrieval;
pub mod search;
pub mod services;
pub mod state;
pub mod summary;
