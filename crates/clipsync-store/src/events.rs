//! Bounded, time-ranked log of clipboard and command events.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use clipsync_shared::types::{EventId, UserId};

use crate::error::Result;
use crate::models::{event_key, user_events_key, Event};
use crate::store::{RecordStore, WriteOp};

/// Append-only per-user event history, expired after a retention
/// window. Used by newly reconnected devices to catch up.
pub struct EventLog {
    store: Arc<dyn RecordStore>,
    retention: Duration,
}

impl EventLog {
    pub fn new(store: Arc<dyn RecordStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Persist an event: body, index entry and TTLs go in as one atomic
    /// batch, so the index can never point at a body that was never
    /// written (and vice versa).
    pub fn append(&self, event: &Event) -> Result<EventId> {
        let id = event.id();
        let user = event.user_id();

        self.store.apply(vec![
            WriteOp::PutRecord {
                key: event_key(id),
                value: serde_json::to_vec(event)?,
                ttl: Some(self.retention),
            },
            WriteOp::IndexInsert {
                index: user_events_key(user),
                score: event.created_at().timestamp_millis(),
                member: id.to_string(),
                ttl: Some(self.retention),
            },
        ])?;

        debug!(user = %user, event = %id, "Appended event");
        Ok(id)
    }

    /// The user's most recent events, newest first. Index entries whose
    /// body already expired are skipped, not errors, so a call may
    /// return fewer than `limit` events near the retention boundary.
    pub fn list_by_user(&self, user: UserId, limit: usize) -> Result<Vec<Event>> {
        let members = self
            .store
            .index_rev_range(&user_events_key(user), limit)?;

        let mut events = Vec::with_capacity(members.len());
        for member in members {
            let Ok(id) = member.parse::<uuid::Uuid>() else {
                continue;
            };
            match self.store.get(&event_key(EventId(id)))? {
                Some(raw) => events.push(serde_json::from_slice(&raw)?),
                None => {
                    debug!(user = %user, event = %id, "Skipping expired event body");
                }
            }
        }
        Ok(events)
    }

    /// Remove an event's body and index entry. Unknown ids are a no-op.
    pub fn delete(&self, id: EventId) -> Result<()> {
        let Some(raw) = self.store.get(&event_key(id))? else {
            return Ok(());
        };
        let event: Event = serde_json::from_slice(&raw)?;

        self.store.apply(vec![
            WriteOp::DeleteRecord { key: event_key(id) },
            WriteOp::IndexRemove {
                index: user_events_key(event.user_id()),
                member: id.to_string(),
            },
        ])?;
        debug!(event = %id, "Deleted event");
        Ok(())
    }
}
