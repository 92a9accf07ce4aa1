//! Event Publisher Implementation
//!
//! 通过 tokio broadcast 分发流水线事件：全局通道 + 每部小说一个通道

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{PipelineEvent, PipelineEventSink};

const CHANNEL_CAPACITY: usize = 100;

/// 事件发布器
pub struct EventPublisher {
    /// novel_id -> broadcast sender
    novel_channels: DashMap<String, broadcast::Sender<PipelineEvent>>,
    global_channel: broadcast::Sender<PipelineEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            novel_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全部事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<PipelineEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅单部小说的事件
    pub fn subscribe(&self, novel_id: &str) -> broadcast::Receiver<PipelineEvent> {
        self.novel_channels
            .entry(novel_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn unsubscribe_all(&self, novel_id: &str) {
        self.novel_channels.remove(novel_id);
    }

    fn novel_id_of(event: &PipelineEvent) -> &str {
        match event {
            PipelineEvent::StatusChanged { novel_id, .. }
            | PipelineEvent::StageStarted { novel_id, .. }
            | PipelineEvent::StageFinished { novel_id, .. }
            | PipelineEvent::ChapterCompleted { novel_id, .. }
            | PipelineEvent::ChapterFailed { novel_id, .. } => novel_id,
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEventSink for EventPublisher {
    fn publish(&self, event: PipelineEvent) {
        let novel_id = Self::novel_id_of(&event);
        if let Some(sender) = self.novel_channels.get(novel_id) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::debug!(novel_id = %novel_id, error = %e, "Failed to publish event (no receivers)");
            }
        }
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish global event (no receivers)");
        }
    }
}
