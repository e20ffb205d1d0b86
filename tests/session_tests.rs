// Integration tests for generation sessions
// Streams are fed from channels so tests control when chunks arrive

#[cfg(test)]
mod session_tests {
    use appforge_lib::config::AppConfig;
    use appforge_lib::events::{
        ChannelEmitter, GenerationEvent, EVENT_GENERATION_COMPLETED, EVENT_GENERATION_FAILED,
        EVENT_GENERATION_PROGRESS,
    };
    use appforge_lib::{
        apply_to_collection, CancelHandle, GeneratedFile, GenerationError, GenerationSession,
        ProjectFileCollection, TransportError,
    };
    use futures_util::stream::{self, Stream};
    use std::time::Duration;
    use tokio::sync::mpsc;

    type ChunkResult = Result<String, TransportError>;

    fn channel_stream(
        rx: mpsc::UnboundedReceiver<ChunkResult>,
    ) -> impl Stream<Item = ChunkResult> {
        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GenerationEvent>) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_session_generates_and_merges_project() {
        let existing: ProjectFileCollection = vec![
            GeneratedFile::new("src/App.tsx", "old"),
            GeneratedFile::new("README.md", "docs"),
        ]
        .into();

        let session = GenerationSession::new(&AppConfig::default(), existing.keys());
        let (emitter, mut events) = ChannelEmitter::channel();
        let chunks: Vec<ChunkResult> = vec![
            Ok("<file name=\"./src/App.tsx\">new".to_string()),
            Ok(" app</file><file name=\"index.html\"><p>hi</p>".to_string()),
            Ok("</file>".to_string()),
        ];

        let project = session
            .run(stream::iter(chunks), &emitter, &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(project.token_count, Some(3));
        assert_eq!(project.preview_document.as_deref(), Some("<p>hi</p>"));

        let events = drain(&mut events);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].payload["steps"][0]["label"], "Updating ./src/App.tsx");
        assert_eq!(events[0].payload["steps"][0]["status"], "in_progress");
        assert_eq!(events[1].payload["steps"][0]["status"], "completed");
        assert_eq!(events[1].payload["steps"][1]["label"], "Creating index.html");
        assert_eq!(events[2].payload["steps"][1]["status"], "completed");
        assert_eq!(events[3].name, EVENT_GENERATION_COMPLETED);
        assert_eq!(events[3].payload["fileCount"], 2);
        assert_eq!(events[3].payload["hasPreview"], true);

        let merged = apply_to_collection(&existing, &project);
        assert_eq!(merged.keys(), vec!["src/App.tsx", "README.md", "index.html"]);
        assert_eq!(merged.get("src/App.tsx").unwrap().content, "new app");
    }

    #[tokio::test]
    async fn test_rate_limited_stream() {
        let session = GenerationSession::new(&AppConfig::default(), Vec::<String>::new());
        let (emitter, mut events) = ChannelEmitter::channel();
        let chunks: Vec<ChunkResult> = vec![Err(TransportError::with_status(
            429,
            "Too many requests. Retry-After: 20",
        ))];

        let err = session
            .run(stream::iter(chunks), &emitter, &CancelHandle::new())
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after_ms(), Some(20_000));

        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, EVENT_GENERATION_FAILED);
        assert_eq!(events[0].payload["rateLimited"], true);
        assert_eq!(events[0].payload["retryAfterMs"], 20_000);
        assert!(events[0].payload["userMessage"]
            .as_str()
            .unwrap()
            .contains("try again"));
    }

    #[tokio::test]
    async fn test_cancel_mid_stream() {
        let session = GenerationSession::new(&AppConfig::default(), Vec::<String>::new());
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel::<ChunkResult>();
        let (emitter, mut events) = ChannelEmitter::channel();
        let cancel = CancelHandle::new();

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            session
                .run(channel_stream(chunk_rx), &emitter, &task_cancel)
                .await
        });

        chunk_tx
            .send(Ok("<file name=\"a.js\">partial".to_string()))
            .unwrap();
        let progress = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.name, EVENT_GENERATION_PROGRESS);

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unwrap_err(), GenerationError::Cancelled);

        // No failed or completed event after cancellation
        assert!(events.try_recv().is_err());
        drop(chunk_tx);
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let mut config = AppConfig::default();
        config.session.chunk_timeout_secs = 1;
        let session = GenerationSession::new(&config, Vec::<String>::new());
        let (_chunk_tx, chunk_rx) = mpsc::unbounded_channel::<ChunkResult>();
        let (emitter, mut events) = ChannelEmitter::channel();

        let err = session
            .run(channel_stream(chunk_rx), &emitter, &CancelHandle::new())
            .await
            .unwrap_err();

        assert_eq!(err, GenerationError::IdleTimeout(1));
        let failed = events.try_recv().unwrap();
        assert_eq!(failed.name, EVENT_GENERATION_FAILED);
        assert_eq!(failed.payload["rateLimited"], false);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let config = AppConfig::default();
        let first = GenerationSession::new(&config, vec!["a.js"]);
        let second = GenerationSession::new(&config, Vec::<String>::new());
        let (emitter_a, _events_a) = ChannelEmitter::channel();
        let (emitter_b, _events_b) = ChannelEmitter::channel();

        let chunks = || -> Vec<ChunkResult> {
            vec![Ok("<file name=\"a.js\">x</file>".to_string())]
        };
        let cancel = CancelHandle::new();
        let (a, b) = tokio::join!(
            first.run(stream::iter(chunks()), &emitter_a, &cancel),
            second.run(stream::iter(chunks()), &emitter_b, &cancel),
        );

        assert_eq!(a.unwrap().files, b.unwrap().files);
    }
}
