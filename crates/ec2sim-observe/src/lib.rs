//! ec2sim Observability
//!
//! This crate provides observability features for the ec2sim endpoint,
//! including:
//!
//! - [`EventDispatcher`]: Observable event system
//! - [`MetricsCollector`]: Per-action request metrics
//! - [`ActionJournal`]: Bounded log of handled requests
//!
//! # Event Subscription
//!
//! ```
//! use ec2sim_core::GroupId;
//! use ec2sim_observe::{CollectingSubscriber, Ec2Event, EventDispatcher, EventSubscriber, LoggingSubscriber};
//! use std::sync::Arc;
//!
//! let dispatcher = EventDispatcher::new();
//! let collector = Arc::new(CollectingSubscriber::new(100));
//! dispatcher.subscribe(Arc::new(LoggingSubscriber::new()));
//! dispatcher.subscribe(Arc::clone(&collector) as Arc<dyn EventSubscriber>);
//!
//! dispatcher.emit(Ec2Event::GroupCreated {
//!     group_id: GroupId::new("sg-0"),
//!     name: "web".to_string(),
//! });
//! assert_eq!(collector.len(), 1);
//! ```
//!
//! # Metrics Collection
//!
//! ```
//! use ec2sim_observe::MetricsCollector;
//! use std::time::Duration;
//!
//! let collector = MetricsCollector::new();
//! collector.record_request("DescribeInstances", Duration::from_micros(40), None);
//!
//! let snapshot = collector.snapshot();
//! assert_eq!(snapshot.count("DescribeInstances"), 1);
//! ```

pub mod events;
pub mod journal;
pub mod metrics;

// Re-export main types
pub use events::{
    CollectingSubscriber, Ec2Event, EventDispatcher, EventSubscriber, LoggingSubscriber,
};
pub use journal::{ActionJournal, ActionOutcome, ActionRecord, RequestId};
pub use metrics::{ActionMetrics, MetricsCollector, MetricsSnapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::{Ec2Event, EventDispatcher, EventSubscriber};
    pub use crate::journal::{ActionJournal, ActionRecord, RequestId};
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
