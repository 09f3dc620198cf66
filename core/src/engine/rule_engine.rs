//! Event sequencer
//!
//! Single-consumer queue in front of the fight state machine. Producers on
//! any thread enqueue; exactly one event is interpreted at a time, in
//! arrival order. Territory changes fetch a descriptor for the new zone and
//! swap the active fight; descriptor misses and validation failures leave
//! the previous fight untouched. The fight state is owned by the consumer
//! task — the only externally visible state is the watch-published snapshot
//! and the shared event history.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::FightRecord;
use crate::duty::DutyDescriptor;
use crate::events::GameEvent;

use super::fight::FightContext;
use super::recorder::{DEFAULT_EVENT_HISTORY, EventLogEntry, EventRecorder};
use super::snapshot::FightSnapshot;

/// Descriptor fetch collaborator. `None` means "no timeline for this zone",
/// whether the zone is undefined or every endpoint failed.
#[async_trait]
pub trait DutyProvider: Send + Sync {
    async fn fetch_duty(&self, zone_id: u32) -> Option<DutyDescriptor>;
}

/// Record upload collaborator. Runs detached from event processing; the
/// return value only feeds diagnostics.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn upload_fight(&self, record: FightRecord) -> bool;
}

pub struct RuleEngine {
    events: mpsc::UnboundedSender<GameEvent>,
    snapshots: watch::Receiver<Arc<FightSnapshot>>,
    history: Arc<Mutex<EventRecorder>>,
    shutdown: watch::Sender<bool>,
    consumer: JoinHandle<()>,
}

impl RuleEngine {
    pub fn new(provider: Arc<dyn DutyProvider>, sink: Arc<dyn RecordSink>) -> Self {
        Self::with_history_limit(provider, sink, DEFAULT_EVENT_HISTORY)
    }

    pub fn with_history_limit(
        provider: Arc<dyn DutyProvider>,
        sink: Arc<dyn RecordSink>,
        history_limit: usize,
    ) -> Self {
        let (events, queue) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(Arc::new(FightSnapshot::default()));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let history = Arc::new(Mutex::new(EventRecorder::new(history_limit)));

        let consumer = tokio::spawn(consume(
            queue,
            provider,
            sink,
            snapshot_tx,
            Arc::clone(&history),
            shutdown_rx,
        ));

        Self {
            events,
            snapshots,
            history,
            shutdown,
            consumer,
        }
    }

    /// Enqueue an event. Never blocks; returns false once the engine has
    /// shut down.
    pub fn post_event(&self, event: GameEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Cloneable sender for producer threads.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<GameEvent> {
        self.events.clone()
    }

    /// Watch the latest published fight snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FightSnapshot>> {
        self.snapshots.clone()
    }

    /// Snapshot of the diagnostic event history, oldest first.
    pub fn recent_events(&self) -> Vec<EventLogEntry> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries()
            .cloned()
            .collect()
    }

    /// Stop the consumer. The event currently being interpreted finishes;
    /// queued events behind it are dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.consumer.await;
    }

    /// Close the queue and wait for every already-posted event to be
    /// interpreted before stopping.
    pub async fn finish(self) {
        drop(self.events);
        let _ = self.consumer.await;
    }
}

async fn consume(
    mut queue: mpsc::UnboundedReceiver<GameEvent>,
    provider: Arc<dyn DutyProvider>,
    sink: Arc<dyn RecordSink>,
    snapshots: watch::Sender<Arc<FightSnapshot>>,
    history: Arc<Mutex<EventRecorder>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut fight: Option<FightContext> = None;

    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = queue.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(&event);

        if let GameEvent::TerritoryChanged { zone_id } = event {
            match provider.fetch_duty(zone_id).await {
                Some(descriptor) => match descriptor.validate() {
                    Ok(()) => {
                        if let Some(previous) = &fight {
                            tracing::info!(
                                from = previous.zone_id(),
                                to = zone_id,
                                "territory changed, replacing active fight"
                            );
                        } else {
                            tracing::info!(zone_id, "territory changed, timeline loaded");
                        }
                        fight = Some(FightContext::new(Arc::new(descriptor)));
                    }
                    Err(error) => {
                        tracing::warn!(zone_id, %error, "rejecting invalid duty descriptor");
                    }
                },
                None => {
                    tracing::debug!(zone_id, "no timeline for zone");
                }
            }
        }

        if let Some(context) = fight.as_mut() {
            if let Some(record) = context.process_event(&event) {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    if !sink.upload_fight(record).await {
                        tracing::warn!("fight record upload failed on every endpoint");
                    }
                });
            }
            let _ = snapshots.send(context.snapshot());
        }
    }
}
