//! In-memory fleet standing in for every outside system
//!
//! One `Fleet` plays the search backend, the tagging, notification,
//! decommission and destroy APIs, the user directory, the mail server and
//! the event reporter. Writes land in the same resource list searches read
//! from, so consecutive ticks see each other's effects.

use super::constants::*;
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};
use reaper::actions::{
    ActionError, Decommissioner, DeliveryError, Destroyer, NotificationParams, Notifier,
    RequestFailure, TagError, Tagger,
};
use reaper::email::{MailError, MailMessage, Mailer};
use reaper::lifecycle::{parse_timestamp, TIMESTAMP_FORMAT};
use reaper::reporting::{EventReporter, ReportError, ReportLevel};
use reaper::search::{
    DateRangeQuery, QueryError, Resource, ResourceFinder, NOTIFIED_AT_TAG, RENEWED_AT_TAG,
};
use reaper::users::{User, UserError, UserFetcher};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct Fleet {
    now: NaiveDateTime,
    resources: Mutex<Vec<Resource>>,
    tag_writes: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    notifications: Mutex<Vec<NotificationParams>>,
    decommissioned: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<String>>,
    outbox: Mutex<Vec<MailMessage>>,
    events: Mutex<Vec<String>>,
    undeliverable: Mutex<HashSet<String>>,
    search_down: AtomicBool,
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            now: NaiveDateTime::parse_from_str(NOW, TIMESTAMP_FORMAT)
                .expect("NOW is a valid timestamp"),
            resources: Mutex::new(Vec::new()),
            tag_writes: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            decommissioned: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            outbox: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            undeliverable: Mutex::new(HashSet::new()),
            search_down: AtomicBool::new(false),
        }
    }

    /// A fleet holding one resource of every kind described in `constants`.
    pub fn seeded() -> Self {
        let fleet = Self::new();
        fleet.add(resource(FRESH_ID, "created", FRESH_RENEWED_AT, ""));
        fleet.add(resource(REMINDED_ID, "created", REMINDED_RENEWED_AT, ""));
        fleet.add(resource(QUIET_ID, "created", QUIET_RENEWED_AT, QUIET_NOTIFIED_AT));
        fleet.add(resource(
            EXPIRED_ID,
            "created",
            EXPIRED_RENEWED_AT,
            EXPIRED_NOTIFIED_AT,
        ));
        fleet.add(resource(DOOMED_ID, "decom", DOOMED_RENEWED_AT, ""));
        fleet.add(resource(LINGERING_ID, "decom", LINGERING_RENEWED_AT, ""));
        fleet
    }

    pub fn add(&self, resource: Resource) {
        self.resources.lock().unwrap().push(resource);
    }

    pub fn resource(&self, id: &str) -> Option<Resource> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn tag_writes_for(&self, id: &str) -> Vec<BTreeMap<String, String>> {
        self.tag_writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(tagged, _)| tagged == id)
            .map(|(_, tags)| tags.clone())
            .collect()
    }

    pub fn notifications(&self) -> Vec<NotificationParams> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn decommissioned(&self) -> Vec<String> {
        self.decommissioned.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn outbox(&self) -> Vec<MailMessage> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Make the notification API reject reminders for `id`.
    pub fn refuse_delivery(&self, id: &str) {
        self.undeliverable.lock().unwrap().insert(id.to_string());
    }

    pub fn accept_delivery(&self, id: &str) {
        self.undeliverable.lock().unwrap().remove(id);
    }

    pub fn set_search_down(&self, down: bool) {
        self.search_down.store(down, Ordering::SeqCst);
    }

    /// Whether `resource` satisfies the status filter and `lte` bound of
    /// `query`. Other term filters are not modelled.
    fn matches(&self, query: &DateRangeQuery, resource: &Resource) -> bool {
        if let Some(status) = query.filter_value("status") {
            if resource.status != status {
                return false;
            }
        }
        let Some(bound) = query.lte.as_deref() else {
            return true;
        };
        let cutoff = bound
            .strip_prefix("now-")
            .and_then(|secs| secs.strip_suffix('s'))
            .and_then(|secs| secs.parse::<i64>().ok())
            .map(|secs| self.now - TimeDelta::seconds(secs));
        match (cutoff, parse_timestamp(&resource.renewed_at)) {
            (Some(cutoff), Ok(renewed_at)) => renewed_at <= cutoff,
            _ => false,
        }
    }
}

pub fn resource(id: &str, status: &str, renewed_at: &str, notified_at: &str) -> Resource {
    Resource {
        id: id.to_string(),
        org: "ss".to_string(),
        status: status.to_string(),
        renewed_at: renewed_at.to_string(),
        notified_at: notified_at.to_string(),
        fqdn: format!("{}.example.edu", id),
        support_contact: OWNER.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl ResourceFinder for Fleet {
    async fn find(&self, queries: &[DateRangeQuery]) -> Result<Vec<Resource>, QueryError> {
        if self.search_down.load(Ordering::SeqCst) {
            return Err(QueryError::Timeout);
        }
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|r| queries.iter().all(|q| self.matches(q, r)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Resource, QueryError> {
        if self.search_down.load(Ordering::SeqCst) {
            return Err(QueryError::Timeout);
        }
        self.resource(id)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl Tagger for Fleet {
    async fn tag(
        &self,
        resource: &Resource,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TagError> {
        if resource.org.is_empty() {
            return Err(TagError::MissingOrg(resource.id.clone()));
        }
        self.tag_writes
            .lock()
            .unwrap()
            .push((resource.id.clone(), tags.clone()));

        let mut resources = self.resources.lock().unwrap();
        if let Some(stored) = resources.iter_mut().find(|r| r.id == resource.id) {
            if let Some(value) = tags.get(RENEWED_AT_TAG) {
                stored.renewed_at = value.clone();
            }
            if let Some(value) = tags.get(NOTIFIED_AT_TAG) {
                stored.notified_at = value.clone();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for Fleet {
    async fn notify(&self, params: &NotificationParams) -> Result<(), DeliveryError> {
        let refused = self
            .undeliverable
            .lock()
            .unwrap()
            .iter()
            .any(|id| params.link.contains(&format!("/renew/{}?", id)));
        if refused {
            return Err(DeliveryError::Request(RequestFailure::Status {
                status: 502,
                body: "mail relay unavailable".to_string(),
            }));
        }
        self.notifications.lock().unwrap().push(params.clone());
        Ok(())
    }
}

#[async_trait]
impl Decommissioner for Fleet {
    async fn decommission(&self, resource: &Resource) -> Result<(), ActionError> {
        self.decommissioned.lock().unwrap().push(resource.id.clone());
        let mut resources = self.resources.lock().unwrap();
        if let Some(stored) = resources.iter_mut().find(|r| r.id == resource.id) {
            stored.status = "decom".to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl Destroyer for Fleet {
    async fn destroy(&self, resource: &Resource) -> Result<(), ActionError> {
        self.destroyed.lock().unwrap().push(resource.id.clone());
        self.resources.lock().unwrap().retain(|r| r.id != resource.id);
        Ok(())
    }
}

#[async_trait]
impl UserFetcher for Fleet {
    async fn fetch(&self, id: &str) -> Result<User, UserError> {
        Ok(User {
            first: "Alice".to_string(),
            last: "Lovelace".to_string(),
            email: format!("{}@example.edu", id),
            netid: id.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for Fleet {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.outbox.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl EventReporter for Fleet {
    fn name(&self) -> &'static str {
        "fleet"
    }

    async fn report(&self, message: &str, _level: ReportLevel) -> Result<(), ReportError> {
        self.events.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
