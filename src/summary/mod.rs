//! Streamed, link-annotated summaries of retrieved passages.
//!
//! [`stream_summary`] sends the prompt built by [`prompt`] to a
//! [`ChatBackend`], feeds every fragment into an [`IncrementalAnnotator`]
//! and yields a [`SummaryEvent::Partial`] rendering after each one. The
//! producer's end marker turns into a single [`SummaryEvent::Final`].

pub mod annotator;
pub mod links;
pub mod prompt;

use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use futures_util::stream::{Stream, StreamExt};

use crate::llm::chat_stream::{ChatBackend, ChatChunk, ChatStream};
use crate::models::RetrievedPassage;
use annotator::IncrementalAnnotator;
use links::{KeywordLinkTable, LinkStyle};

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryEvent {
    /// Annotated summary so far
    Partial(String),
    /// Annotated summary after the end-of-stream marker
    Final(String),
}

pub type SummaryStream = Pin<Box<dyn Stream<Item = Result<SummaryEvent>> + Send>>;

/// Start a streamed summary of the top passages for `query`.
///
/// Fails before contacting the backend when fewer than three passages are
/// available. The returned stream ends after `Final` or after the first error.
pub async fn stream_summary(
    chat: &dyn ChatBackend,
    table: Arc<KeywordLinkTable>,
    style: LinkStyle,
    query: &str,
    passages: &[RetrievedPassage],
) -> Result<SummaryStream> {
    let messages = prompt::build_messages(query, passages)?;
    let llm_stream = chat.stream(messages).await?;
    let annotator = IncrementalAnnotator::new(table, style);

    Ok(annotate_stream(llm_stream, annotator))
}

/// Feed completion chunks through `annotator`, one event per chunk.
pub fn annotate_stream(llm_stream: ChatStream, annotator: IncrementalAnnotator) -> SummaryStream {
    Box::pin(futures_util::stream::unfold(
        Some((llm_stream, annotator)),
        |state| async move {
            let (mut llm_stream, mut annotator) = state?;
            match llm_stream.next().await {
                Some(Ok(ChatChunk::Delta(fragment))) => {
                    tracing::debug!("Summary fragment: {} bytes", fragment.len());
                    annotator.push(&fragment);
                    let partial = annotator.render();
                    Some((
                        Ok(SummaryEvent::Partial(partial)),
                        Some((llm_stream, annotator)),
                    ))
                }
                Some(Ok(ChatChunk::Finished)) => {
                    Some((Ok(SummaryEvent::Final(annotator.finish())), None))
                }
                Some(Err(e)) => Some((Err(e), None)),
                None => {
                    tracing::warn!("Completion stream closed without an end marker");
                    Some((Ok(SummaryEvent::Final(annotator.finish())), None))
                }
            }
        },
    ))
}

/// Run a summary to completion, calling `on_partial` after every fragment.
pub async fn summarize(
    chat: &dyn ChatBackend,
    table: Arc<KeywordLinkTable>,
    style: LinkStyle,
    query: &str,
    passages: &[RetrievedPassage],
    mut on_partial: impl FnMut(&str),
) -> Result<String> {
    let mut stream = stream_summary(chat, table, style, query, passages).await?;
    while let Some(event) = stream.next().await {
        match event? {
            SummaryEvent::Partial(text) => on_partial(&text),
            SummaryEvent::Final(text) => return Ok(text),
        }
    }
    anyhow::bail!("Summary stream ended without a final result")
}
