//! Relation flags driven by optimistic mutations, plus transient UI errors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::RelationKey;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationsSlice {
    pub values: HashMap<RelationKey, bool>,
    /// Requests in flight per key.
    pub in_flight: HashMap<RelationKey, u32>,
}

impl RelationsSlice {
    pub fn get(&self, key: &RelationKey) -> Option<bool> {
        self.values.get(key).copied()
    }

    pub fn set(&mut self, key: RelationKey, value: bool) {
        self.values.insert(key, value);
    }

    /// Snapshot what is visible now, then show `value`.
    pub fn begin(&mut self, key: RelationKey, value: bool) -> Option<bool> {
        let snapshot = self.values.insert(key, value);
        *self.in_flight.entry(key).or_insert(0) += 1;
        snapshot
    }

    pub fn settle(&mut self, key: &RelationKey) {
        if let Some(count) = self.in_flight.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(key);
            }
        }
    }

    /// Put the snapshot back exactly, including "never loaded".
    pub fn restore(&mut self, key: RelationKey, snapshot: Option<bool>) {
        match snapshot {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    pub fn is_pending(&self, key: &RelationKey) -> bool {
        self.in_flight.contains_key(key)
    }
}

/// Dismissible in-place error shown after a failed action.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientError {
    pub id: Uuid,
    pub key: Option<RelationKey>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl TransientError {
    pub fn new(key: Option<RelationKey>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            message: message.into(),
            at: Utc::now(),
        }
    }
}
