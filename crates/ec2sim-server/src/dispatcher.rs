//! The request dispatcher.
//!
//! Every request runs through the same stages:
//!
//! ```text
//! QueryParams ──decode──▶ Ec2Request ──execute──▶ ResourceStore
//!                  │                      │
//!                  └──── Ec2Error ◀───────┘
//!                              │
//!              events · metrics · journal ──▶ Reply
//! ```
//!
//! Decoding validates everything it can without the store, so a malformed
//! request is rejected before the engine sees it. Execution is one store
//! call, which is itself atomic.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use ec2sim_core::{Ec2Result, SharedStore};
use ec2sim_filter::{GroupFilter, InstanceFilter};
use ec2sim_observe::{
    ActionJournal, ActionOutcome, ActionRecord, Ec2Event, EventDispatcher, MetricsCollector,
    RequestId,
};

use crate::params::QueryParams;
use crate::request::{Action, Ec2Request};
use crate::response::{Ec2Response, Reply};

/// Metrics key shared by every unrecognised `Action` value.
pub const UNKNOWN_ACTION: &str = "unknown";

/// Routes decoded requests to the store and records what happened.
pub struct Dispatcher {
    store: SharedStore,
    events: Arc<EventDispatcher>,
    journal: Arc<ActionJournal>,
    metrics: Arc<MetricsCollector>,
}

impl Dispatcher {
    /// Create a dispatcher over `store` with fresh observers.
    pub fn new(store: SharedStore, journal_capacity: usize) -> Self {
        Self {
            store,
            events: Arc::new(EventDispatcher::new()),
            journal: Arc::new(ActionJournal::new(journal_capacity)),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Use an existing event dispatcher.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    /// Use an existing journal.
    pub fn with_journal(mut self, journal: Arc<ActionJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Use an existing metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn journal(&self) -> &Arc<ActionJournal> {
        &self.journal
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Handle one request end to end.
    pub fn handle(&self, params: QueryParams) -> Reply {
        let started = Instant::now();
        let request_id = RequestId::new();
        let action = params.get("Action").unwrap_or_default().to_string();

        let result = Ec2Request::decode(&params).and_then(|request| self.execute(request));
        let duration = started.elapsed();

        match &result {
            Ok(_) => debug!(%request_id, action = %action, ?duration, "Handled request"),
            Err(err) => {
                warn!(
                    %request_id,
                    action = %action,
                    code = %err.code,
                    message = %err.message,
                    "Rejected request"
                );
                self.events.emit(Ec2Event::RequestRejected {
                    action: action.clone(),
                    code: err.code,
                    message: err.message.clone(),
                });
            }
        }

        let error_code = result.as_ref().err().map(|err| err.code);
        let metric_key = action
            .parse::<Action>()
            .map_or(UNKNOWN_ACTION, |parsed| parsed.as_str());
        self.metrics.record_request(metric_key, duration, error_code);
        self.journal.record(ActionRecord {
            request_id,
            action: action.clone(),
            params: params.into_pairs(),
            outcome: match &result {
                Ok(_) => ActionOutcome::Success,
                Err(err) => ActionOutcome::from(err),
            },
            duration,
        });

        Reply {
            request_id,
            action,
            result,
        }
    }

    /// Apply a decoded request to the store.
    pub fn execute(&self, request: Ec2Request) -> Ec2Result<Ec2Response> {
        let store = &self.store;
        let response = match request {
            Ec2Request::CreateSecurityGroup { name, description } => {
                let group = store.create_group(&name, &description)?;
                self.events.emit(Ec2Event::GroupCreated {
                    group_id: group.id.clone(),
                    name: group.name.clone(),
                });
                Ec2Response::GroupCreated(group)
            }
            Ec2Request::DeleteSecurityGroup { group } => {
                let deleted = store.delete_group(&group)?;
                self.events.emit(Ec2Event::GroupDeleted {
                    group_id: deleted.id,
                    name: deleted.name,
                });
                Ec2Response::Acknowledged(Action::DeleteSecurityGroup)
            }
            Ec2Request::DescribeSecurityGroups { groups, filter } => {
                let filter = GroupFilter::compile(&filter)?;
                Ec2Response::SecurityGroups(store.list_groups(&groups, &filter)?)
            }
            Ec2Request::AuthorizeSecurityGroupIngress { group, permissions } => {
                let updated = store.authorize_ingress(&group, &permissions)?;
                self.events.emit(Ec2Event::IngressAuthorized {
                    group_id: updated.id,
                    rules: permissions.len(),
                });
                Ec2Response::Acknowledged(Action::AuthorizeSecurityGroupIngress)
            }
            Ec2Request::RevokeSecurityGroupIngress { group, permissions } => {
                let updated = store.revoke_ingress(&group, &permissions)?;
                self.events.emit(Ec2Event::IngressRevoked {
                    group_id: updated.id,
                    rules: permissions.len(),
                });
                Ec2Response::Acknowledged(Action::RevokeSecurityGroupIngress)
            }
            Ec2Request::RunInstances(params) => {
                let reservation = store.run_instances(&params)?;
                self.events.emit(Ec2Event::InstancesLaunched {
                    reservation_id: reservation.id.clone(),
                    image_id: params.image_id,
                    instance_ids: reservation.instances.iter().map(|i| i.id.clone()).collect(),
                });
                Ec2Response::Launched(reservation)
            }
            Ec2Request::TerminateInstances { instance_ids } => {
                let changes = store.terminate_instances(&instance_ids)?;
                self.events.emit(Ec2Event::InstancesTerminated {
                    instance_ids: changes.iter().map(|c| c.instance.id.clone()).collect(),
                });
                Ec2Response::Terminated(changes)
            }
            Ec2Request::DescribeInstances {
                instance_ids,
                filter,
            } => {
                let filter = InstanceFilter::compile(&filter)?;
                Ec2Response::Instances(store.list_instances(&instance_ids, &filter)?)
            }
        };
        Ok(response)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .field("subscribers", &self.events.subscriber_count())
            .field("journal", &self.journal)
            .finish()
    }
}
