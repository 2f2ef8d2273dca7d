//! Observable events emitted while serving requests.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use ec2sim_core::{ErrorCode, GroupId, InstanceId, ReservationId};

/// State changes and rejections the endpoint reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ec2Event {
    /// A security group was created.
    GroupCreated {
        group_id: GroupId,
        name: String,
    },
    /// A security group was deleted.
    GroupDeleted {
        group_id: GroupId,
        name: String,
    },
    /// Ingress rules were authorized on a group.
    IngressAuthorized {
        group_id: GroupId,
        /// Number of rules in the request.
        rules: usize,
    },
    /// Ingress rules were revoked from a group.
    IngressRevoked {
        group_id: GroupId,
        rules: usize,
    },
    /// A reservation was launched.
    InstancesLaunched {
        reservation_id: ReservationId,
        image_id: String,
        instance_ids: Vec<InstanceId>,
    },
    /// Instances were terminated.
    InstancesTerminated {
        instance_ids: Vec<InstanceId>,
    },
    /// A request failed with a provider error.
    RequestRejected {
        action: String,
        code: ErrorCode,
        message: String,
    },
}

impl Ec2Event {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Ec2Event::GroupCreated { .. } => "group_created",
            Ec2Event::GroupDeleted { .. } => "group_deleted",
            Ec2Event::IngressAuthorized { .. } => "ingress_authorized",
            Ec2Event::IngressRevoked { .. } => "ingress_revoked",
            Ec2Event::InstancesLaunched { .. } => "instances_launched",
            Ec2Event::InstancesTerminated { .. } => "instances_terminated",
            Ec2Event::RequestRejected { .. } => "request_rejected",
        }
    }
}

/// Subscriber for endpoint events.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &Ec2Event);

    /// Event types this subscriber wants; `None` means all of them.
    fn event_filter(&self) -> Option<Vec<&'static str>> {
        None
    }
}

/// A subscriber that forwards every event to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingSubscriber;

impl LoggingSubscriber {
    pub fn new() -> Self {
        Self
    }
}

impl EventSubscriber for LoggingSubscriber {
    fn on_event(&self, event: &Ec2Event) {
        match event {
            Ec2Event::GroupCreated { group_id, name } => {
                tracing::info!(
                    event = "group_created",
                    group_id = %group_id,
                    name = name,
                    "Security group created"
                );
            }
            Ec2Event::GroupDeleted { group_id, name } => {
                tracing::info!(
                    event = "group_deleted",
                    group_id = %group_id,
                    name = name,
                    "Security group deleted"
                );
            }
            Ec2Event::IngressAuthorized { group_id, rules } => {
                tracing::debug!(
                    event = "ingress_authorized",
                    group_id = %group_id,
                    rules = rules,
                    "Ingress authorized"
                );
            }
            Ec2Event::IngressRevoked { group_id, rules } => {
                tracing::debug!(
                    event = "ingress_revoked",
                    group_id = %group_id,
                    rules = rules,
                    "Ingress revoked"
                );
            }
            Ec2Event::InstancesLaunched {
                reservation_id,
                image_id,
                instance_ids,
            } => {
                tracing::info!(
                    event = "instances_launched",
                    reservation_id = %reservation_id,
                    image_id = image_id,
                    count = instance_ids.len(),
                    "Instances launched"
                );
            }
            Ec2Event::InstancesTerminated { instance_ids } => {
                tracing::info!(
                    event = "instances_terminated",
                    count = instance_ids.len(),
                    "Instances terminated"
                );
            }
            Ec2Event::RequestRejected {
                action,
                code,
                message,
            } => {
                tracing::warn!(
                    event = "request_rejected",
                    action = action,
                    code = %code,
                    message = message,
                    "Request rejected"
                );
            }
        }
    }
}

/// A subscriber that collects events for later inspection.
pub struct CollectingSubscriber {
    events: RwLock<Vec<(Instant, Ec2Event)>>,
    max_events: usize,
    filter: Option<Vec<&'static str>>,
}

impl CollectingSubscriber {
    /// Create a collector that keeps at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
            filter: None,
        }
    }

    /// Only collect the given event types.
    pub fn with_filter(mut self, event_types: Vec<&'static str>) -> Self {
        self.filter = Some(event_types);
        self
    }

    /// Get collected events with their arrival times.
    pub fn events(&self) -> Vec<(Instant, Ec2Event)> {
        self.events.read().clone()
    }

    /// Get collected events without timestamps.
    pub fn event_list(&self) -> Vec<Ec2Event> {
        self.events.read().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSubscriber for CollectingSubscriber {
    fn on_event(&self, event: &Ec2Event) {
        let mut events = self.events.write();
        if events.len() < self.max_events {
            events.push((Instant::now(), event.clone()));
        }
    }

    fn event_filter(&self) -> Option<Vec<&'static str>> {
        self.filter.clone()
    }
}

impl std::fmt::Debug for CollectingSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectingSubscriber")
            .field("len", &self.len())
            .field("max_events", &self.max_events)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Event dispatcher that manages subscribers.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Remove all subscribers.
    pub fn clear_subscribers(&self) {
        self.subscribers.write().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Emit an event to every interested subscriber.
    pub fn emit(&self, event: Ec2Event) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            let wanted = subscriber
                .event_filter()
                .is_none_or(|types| types.contains(&event.event_type()));
            if wanted {
                subscriber.on_event(&event);
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
