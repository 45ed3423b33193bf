//! Optional hosted language services: translation and speech synthesis.

pub mod speech;
pub mod translate;
