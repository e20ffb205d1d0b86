// Generation session: drives the stream decoder over a chunked response
//
// One session per request. The session owns its decoder state and drops it
// when `run` returns, whatever the outcome.

pub mod cancel;
pub mod error;
pub mod rate_limit;

pub use cancel::CancelHandle;
pub use error::{GenerationError, TransportError};
pub use rate_limit::{detect_rate_limit, RateLimitInfo, RateLimitType};

use chrono::{DateTime, Utc};
use futures_util::{pin_mut, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

use crate::config::AppConfig;
use crate::events::{
    emit_payload, GenerationCompletedPayload, GenerationEventEmitter, GenerationFailedPayload,
    GenerationProgressPayload, EVENT_GENERATION_COMPLETED, EVENT_GENERATION_FAILED,
    EVENT_GENERATION_PROGRESS,
};
use crate::files::merge_with_summary;
use crate::models::{GeneratedProject, ProjectFileCollection};
use crate::parsers::StreamState;
use crate::utils::truncate_string;

type ChunkResult = Result<String, TransportError>;

/// A single generation request
#[derive(Debug)]
pub struct GenerationSession {
    session_id: String,
    chunk_timeout_secs: u64,
    state: StreamState,
    chunks_received: u64,
    started_at: DateTime<Utc>,
}

impl GenerationSession {
    /// Create a session. `existing_names` are the project's paths right now;
    /// later changes to the project do not affect this session's labels.
    pub fn new<I, S>(config: &AppConfig, existing_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            chunk_timeout_secs: config.session.chunk_timeout_secs,
            state: StreamState::with_config(existing_names, config.decoder),
            chunks_received: 0,
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Consume `stream` to the end and return the extracted project.
    ///
    /// A progress event is emitted after every chunk. On success a completed
    /// event follows; transport failures and idle timeouts emit a failed event.
    /// Cancellation returns [`GenerationError::Cancelled`] without emitting.
    pub async fn run<S, E>(
        mut self,
        stream: S,
        emitter: &E,
        cancel: &CancelHandle,
    ) -> Result<GeneratedProject, GenerationError>
    where
        S: Stream<Item = ChunkResult>,
        E: GenerationEventEmitter + ?Sized,
    {
        log::info!("Generation session {} started", self.session_id);
        pin_mut!(stream);

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = next_chunk(&mut stream, self.chunk_timeout_secs) => Some(item),
            };

            match next {
                None => return Err(self.cancelled()),
                Some(Err(e)) => return Err(self.fail(emitter, e)),
                Some(Ok(None)) => break,
                Some(Ok(Some(Err(transport)))) => {
                    return Err(self.fail(emitter, transport.into()));
                }
                Some(Ok(Some(Ok(chunk)))) => self.handle_chunk(&chunk, emitter),
            }
        }

        Ok(self.finish(emitter))
    }

    fn handle_chunk<E>(&mut self, chunk: &str, emitter: &E)
    where
        E: GenerationEventEmitter + ?Sized,
    {
        if !chunk.is_empty() {
            self.chunks_received += 1;
        }

        self.state.push_chunk(chunk);

        emit_payload(
            emitter,
            EVENT_GENERATION_PROGRESS,
            &GenerationProgressPayload {
                session_id: self.session_id.clone(),
                steps: self.state.snapshot(),
            },
        );
    }

    fn finish<E>(self, emitter: &E) -> GeneratedProject
    where
        E: GenerationEventEmitter + ?Sized,
    {
        let mut project = self.state.extract();
        project.token_count = Some(self.chunks_received);

        let elapsed = Utc::now().signed_duration_since(self.started_at);
        log::info!(
            "Generation session {} completed in {}ms: {} files, {} incomplete, preview: {}",
            self.session_id,
            elapsed.num_milliseconds(),
            project.files.len(),
            project.incomplete_files.len(),
            project.has_preview()
        );

        emit_payload(
            emitter,
            EVENT_GENERATION_COMPLETED,
            &GenerationCompletedPayload {
                session_id: self.session_id.clone(),
                file_count: project.files.len(),
                incomplete_count: project.incomplete_files.len(),
                has_preview: project.has_preview(),
                token_count: self.chunks_received,
            },
        );

        project
    }

    fn fail<E>(self, emitter: &E, error: GenerationError) -> GenerationError
    where
        E: GenerationEventEmitter + ?Sized,
    {
        log::warn!(
            "Generation session {} failed after {} chunks: {}",
            self.session_id,
            self.chunks_received,
            truncate_string(&error.to_string(), 200)
        );

        emit_payload(
            emitter,
            EVENT_GENERATION_FAILED,
            &GenerationFailedPayload {
                session_id: self.session_id.clone(),
                error: error.to_string(),
                user_message: error.user_message(),
                rate_limited: error.is_rate_limited(),
                retry_after_ms: error.retry_after_ms(),
            },
        );

        error
    }

    fn cancelled(self) -> GenerationError {
        log::info!(
            "Generation session {} cancelled after {} chunks",
            self.session_id,
            self.chunks_received
        );
        GenerationError::Cancelled
    }
}

/// Await the next stream item, bounded by the idle timeout (0 waits forever)
async fn next_chunk<S>(
    stream: &mut Pin<&mut S>,
    timeout_secs: u64,
) -> Result<Option<ChunkResult>, GenerationError>
where
    S: Stream<Item = ChunkResult>,
{
    if timeout_secs == 0 {
        return Ok(stream.next().await);
    }

    tokio::time::timeout(Duration::from_secs(timeout_secs), stream.next())
        .await
        .map_err(|_| GenerationError::IdleTimeout(timeout_secs))
}

/// Merge a finished generation into the project's files
pub fn apply_to_collection(
    existing: &ProjectFileCollection,
    project: &GeneratedProject,
) -> ProjectFileCollection {
    let (merged, summary) = merge_with_summary(existing, &project.files);
    log::info!(
        "Applied generation to project: {} created, {} updated, {} files total",
        summary.created,
        summary.updated,
        merged.len()
    );
    for incomplete in &project.incomplete_files {
        log::warn!(
            "Skipped unterminated file {} ({} bytes received)",
            incomplete.name,
            incomplete.partial_content.len()
        );
    }
    merged
}
