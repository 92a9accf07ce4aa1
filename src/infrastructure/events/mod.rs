//! Events - 流水线事件分发

mod publisher;

pub use publisher::EventPublisher;
