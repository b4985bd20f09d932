//! Interactive sessions delivered as an ordered event stream.
//!
//! The pipeline runs in its own task and reports progress over an unbounded
//! channel. A driver task turns that progress into [`StreamEvent`]s, adds
//! heartbeats while the pipeline is quiet, streams the final report in chunks
//! and closes with exactly one `done`. If the receiver goes away, the driver
//! aborts the pipeline task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::pipeline::{DiagnosticPipeline, PipelineProgress};
use crate::domain::errors::DomainResult;
use crate::domain::models::config::StreamConfig;
use crate::domain::models::{new_trace_id, StreamEvent, StreamEventKind};

pub const ACKNOWLEDGEMENT: &str = "Request received, starting the multi-agent diagnosis...";

/// Receiver half of an interactive session.
#[derive(Debug)]
pub struct EventStream {
    pub conversation_id: String,
    pub trace_id: String,
    pub events: mpsc::Receiver<StreamEvent>,
}

#[derive(Clone)]
pub struct StreamEmitter {
    pipeline: Arc<DiagnosticPipeline>,
    config: StreamConfig,
}

impl StreamEmitter {
    pub fn new(pipeline: Arc<DiagnosticPipeline>, config: StreamConfig) -> Self {
        Self { pipeline, config }
    }

    /// Start an interactive session. A new conversation id is generated when
    /// none is given.
    pub fn start(&self, query: String, conversation_id: Option<String>) -> EventStream {
        let conversation_id = conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let trace_id = new_trace_id();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let span = tracing::info_span!("stream", %trace_id, %conversation_id);
        let driver = Driver {
            pipeline: Arc::clone(&self.pipeline),
            config: self.config.clone(),
            sink: EventSink {
                tx,
                conversation_id: conversation_id.clone(),
            },
            trace_id: trace_id.clone(),
        };
        tokio::spawn(driver.run(query).instrument(span));

        EventStream {
            conversation_id,
            trace_id,
            events: rx,
        }
    }
}

/// The receiver was dropped.
struct ClientGone;

/// Writer half. `finish` and `fail` consume the sink, so `done` can be sent
/// only once and nothing can follow it.
struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    conversation_id: String,
}

impl EventSink {
    async fn emit(
        &self,
        kind: StreamEventKind,
        payload: impl Into<String>,
    ) -> Result<(), ClientGone> {
        self.tx
            .send(StreamEvent::new(kind, &self.conversation_id, payload))
            .await
            .map_err(|_| ClientGone)
    }

    async fn finish(self) {
        let _ = self.emit(StreamEventKind::Done, "").await;
    }

    async fn fail(self, message: String) {
        if self.emit(StreamEventKind::Error, message).await.is_ok() {
            self.finish().await;
        }
    }
}

/// Aborts the pipeline task when the driver stops early.
struct AbortOnDrop(JoinHandle<DomainResult<String>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Driver {
    pipeline: Arc<DiagnosticPipeline>,
    config: StreamConfig,
    sink: EventSink,
    trace_id: String,
}

impl Driver {
    async fn run(self, query: String) {
        let Self {
            pipeline,
            config,
            sink,
            trace_id,
        } = self;

        if sink.emit(StreamEventKind::Content, ACKNOWLEDGEMENT).await.is_err() {
            return;
        }

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<PipelineProgress>();
        let mut session = pipeline.query_session(&query, sink.conversation_id.clone(), trace_id);
        let mut task = AbortOnDrop(tokio::spawn(async move {
            pipeline.run(&mut session, &progress_tx).await
        }));

        let interval = config.heartbeat_interval();
        let mut last_event = Instant::now();

        let outcome = loop {
            tokio::select! {
                progress = progress_rx.recv() => match progress {
                    Some(progress) => {
                        if sink.emit(progress.kind(), progress.message()).await.is_err() {
                            info!("client disconnected; cancelling diagnosis");
                            return;
                        }
                        last_event = Instant::now();
                    }
                    // Sender dropped: the pipeline task has returned.
                    None => break (&mut task.0).await,
                },
                () = time::sleep_until(last_event + interval) => {
                    if sink.emit(StreamEventKind::Heartbeat, "").await.is_err() {
                        info!("client disconnected; cancelling diagnosis");
                        return;
                    }
                    last_event = Instant::now();
                }
                () = sink.tx.closed() => {
                    info!("client disconnected; cancelling diagnosis");
                    return;
                }
            }
        };

        match outcome {
            Ok(Ok(report)) => {
                if stream_report(&sink, &report, &config).await.is_err() {
                    info!("client disconnected during report delivery");
                    return;
                }
                sink.finish().await;
            }
            Ok(Err(err)) => {
                sink.fail(format!("Diagnosis failed: {err}")).await;
            }
            Err(join_err) => {
                warn!(error = %join_err, "diagnosis task ended abnormally");
                sink.fail("Diagnosis aborted unexpectedly".to_string()).await;
            }
        }
    }
}

/// Typewriter delivery: `chunk_size` characters per event, `chunk_delay` apart.
async fn stream_report(
    sink: &EventSink,
    report: &str,
    config: &StreamConfig,
) -> Result<(), ClientGone> {
    let chars: Vec<char> = report.chars().collect();
    let delay = config.chunk_delay();
    for (i, chunk) in chars.chunks(config.chunk_size.max(1)).enumerate() {
        if i > 0 && !delay.is_zero() {
            time::sleep(delay).await;
        }
        sink.emit(StreamEventKind::Content, chunk.iter().collect::<String>())
            .await?;
    }
    Ok(())
}
