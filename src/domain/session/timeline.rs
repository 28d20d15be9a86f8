//! Ordered, deduplicated message timeline for one session.
//!
//! Messages reach a timeline from three paths: historical fetch, pushed
//! events, and local optimistic inserts. No global ordering is guaranteed
//! between those paths, so correctness rests on a single dedup gate that
//! every ingested message passes through.
//!
//! # Invariant
//!
//! Within one timeline, no two entries share the same non-empty server id,
//! and no two entries share the same non-empty temp id.

use crate::domain::foundation::{MessageId, TempId};

use super::{Message, MessageStatus};

/// Tolerance for the content-equality fallback when neither side carries an
/// identifier.
pub const DEDUP_WINDOW_MILLIS: i64 = 1_000;

/// Result of pushing a message through the dedup gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New entry appended to the timeline.
    Inserted,

    /// The message matched a pending optimistic entry by temp id and carried
    /// a server id; the existing entry was reconciled in place.
    Reconciled,

    /// Already present; dropped silently.
    Duplicate,
}

/// Time-ordered, deduplicated list of messages for one session.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<Message>,
}

impl Timeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ingests one message through the dedup gate.
    ///
    /// Duplicate detection, in order:
    /// 1. exact server-id match,
    /// 2. exact temp-id match (adopting the server id when the incoming copy
    ///    carries one the existing entry lacks),
    /// 3. fallback: identical content with creation times within
    ///    [`DEDUP_WINDOW_MILLIS`], applied only when neither side carries any
    ///    identifier.
    pub fn ingest(&mut self, message: Message) -> IngestOutcome {
        if let Some(id) = &message.id {
            if self.entries.iter().any(|m| m.id.as_ref() == Some(id)) {
                return IngestOutcome::Duplicate;
            }
        }

        if let Some(temp_id) = &message.temp_id {
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|m| m.temp_id.as_ref() == Some(temp_id))
            {
                if message.id.is_some() && existing.id.is_none() {
                    existing.id = message.id;
                    existing.status = message.status;
                    return IngestOutcome::Reconciled;
                }
                return IngestOutcome::Duplicate;
            }
        }

        if message.id.is_none() && message.temp_id.is_none() {
            let duplicate = self.entries.iter().any(|m| {
                m.id.is_none()
                    && m.temp_id.is_none()
                    && m.content == message.content
                    && m.created_at.millis_between(&message.created_at) <= DEDUP_WINDOW_MILLIS
            });
            if duplicate {
                return IngestOutcome::Duplicate;
            }
        }

        // Stable insert: entries with equal timestamps keep arrival order.
        let index = self
            .entries
            .partition_point(|m| m.created_at <= message.created_at);
        self.entries.insert(index, message);
        IngestOutcome::Inserted
    }

    /// Reconciles the entry with the given temp id to its server identity.
    ///
    /// Returns false (a no-op, not an error) when no entry matches, e.g.
    /// because a pushed copy already reconciled it.
    pub fn reconcile(
        &mut self,
        temp_id: &TempId,
        final_id: MessageId,
        status: MessageStatus,
    ) -> bool {
        // Guard the id-uniqueness invariant when an acknowledgment races a
        // pushed copy carrying the same server id.
        if self
            .entries
            .iter()
            .any(|m| m.id.as_ref() == Some(&final_id) && m.temp_id.as_ref() != Some(temp_id))
        {
            return false;
        }

        match self
            .entries
            .iter_mut()
            .find(|m| m.temp_id.as_ref() == Some(temp_id))
        {
            Some(entry) => {
                entry.id = Some(final_id);
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Marks the pending entry with the given temp id as failed.
    ///
    /// Returns false when no entry matches.
    pub fn mark_send_failed(&mut self, temp_id: &TempId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|m| m.temp_id.as_ref() == Some(temp_id))
        {
            Some(entry) => {
                entry.status = MessageStatus::Error;
                true
            }
            None => false,
        }
    }
}
