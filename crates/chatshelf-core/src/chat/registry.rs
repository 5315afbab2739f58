//! In-memory session registry.
//!
//! Holds every live session in insertion order (front = most recently
//! inserted) and converts to and from the persisted [`HistoryMap`]. Recency
//! ordering is always re-derived from `created_at`, so iteration order never
//! needs to survive a round-trip through the store.
//!
//! Stored entries whose identifier cannot be parsed (legacy bare-array
//! records with a foreign name) are quarantined: they are kept out of the live
//! registry, reported to the caller, and written back untouched on every save.

use chrono::{DateTime, Local, Utc};
use tracing::warn;

use chatshelf_types::chat::{HistoryMap, Session, StoredSession, format_session_id};
use chatshelf_types::error::ChatError;

/// Result of rebuilding a registry from storage.
pub struct RegistryLoad {
    pub registry: SessionRegistry,
    /// One `MalformedIdentifier` or `UnreadableEntry` error per quarantined entry.
    pub malformed: Vec<ChatError>,
}

#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    quarantined: HistoryMap,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a stored mapping.
    ///
    /// Iteration order of the result is most recent first.
    pub fn from_stored(histories: HistoryMap) -> RegistryLoad {
        let mut registry = SessionRegistry::new();
        let mut malformed = Vec::new();

        for (id, stored) in histories {
            match stored.clone().into_session(id.clone()) {
                Ok(session) => registry.sessions.push(session),
                Err(err) => {
                    warn!(session_id = %id, error = %err, "Quarantining stored session");
                    registry.quarantined.insert(id, stored);
                    malformed.push(err);
                }
            }
        }

        registry.sessions.sort_by(|a, b| recency(b, a));
        RegistryLoad {
            registry,
            malformed,
        }
    }

    /// Snapshot for persistence, including quarantined entries.
    pub fn to_stored(&self) -> HistoryMap {
        let mut map = self.quarantined.clone();
        for session in &self.sessions {
            map.insert(session.id.clone(), StoredSession::from(session));
        }
        map
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// The session named `id`, or a fresh one minted and inserted at the
    /// front when `id` is missing. Callers compare the returned identifier
    /// with `id` to detect the second case.
    pub fn get_or_create(&mut self, id: &str) -> &mut Session {
        let index = match self.sessions.iter().position(|s| s.id == id) {
            Some(index) => index,
            None => {
                let session = self.create();
                self.sessions.insert(0, session);
                0
            }
        };
        &mut self.sessions[index]
    }

    /// Sessions in insertion order (front first).
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// Sessions sorted by creation time, most recent first.
    ///
    /// Sessions created in the same instant are ordered by identifier,
    /// descending, so the order is total.
    pub fn list_ordered_by_recency(&self) -> Vec<&Session> {
        let mut ordered: Vec<&Session> = self.sessions.iter().collect();
        ordered.sort_by(|a, b| recency(b, a));
        ordered
    }

    pub fn most_recent(&self) -> Option<&Session> {
        self.sessions.iter().max_by(|a, b| recency(a, b))
    }

    /// Mint an empty session stamped with the current time.
    ///
    /// The session is not inserted; see [`Self::insert_front`].
    pub fn create(&self) -> Session {
        self.create_at(Local::now())
    }

    /// Mint an empty session stamped with `now`.
    ///
    /// Identifiers have one-second resolution; a second session minted in the
    /// same second gets a ` #2` suffix (then ` #3`, ...), so an existing entry
    /// is never overwritten.
    pub fn create_at(&self, now: DateTime<Local>) -> Session {
        let mut ordinal = 1;
        let id = loop {
            let candidate = format_session_id(&now, ordinal);
            if !self.contains(&candidate) && !self.quarantined.contains_key(&candidate) {
                break candidate;
            }
            ordinal += 1;
        };
        Session::new(id, now.with_timezone(&Utc))
    }

    /// Place `session` at the front of iteration order.
    ///
    /// An existing session with the same identifier is replaced.
    pub fn insert_front(&mut self, session: Session) {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
    }

    /// Remove a session. The caller must re-point any selection that named it.
    pub fn delete(&mut self, id: &str) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    /// Remove every session (quarantined entries included) and insert one
    /// fresh empty session. Returns its identifier.
    pub fn clear_all(&mut self) -> String {
        self.clear_all_at(Local::now())
    }

    pub fn clear_all_at(&mut self, now: DateTime<Local>) -> String {
        self.sessions.clear();
        self.quarantined.clear();
        let session = self.create_at(now);
        let id = session.id.clone();
        self.sessions.push(session);
        id
    }
}

fn recency(a: &Session, b: &Session) -> std::cmp::Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatshelf_types::chat::Message;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 15, h, m, s).earliest().unwrap()
    }

    fn registry_with(times: &[(u32, u32, u32)]) -> SessionRegistry {
        let mut registry = SessionRegistry::new();
        for &(h, m, s) in times {
            let session = registry.create_at(at(h, m, s));
            registry.insert_front(session);
        }
        registry
    }

    #[test]
    fn test_recency_scenario_ten_oh_five_first() {
        let registry = registry_with(&[(10, 5, 0), (10, 0, 0)]);
        let ids: Vec<&str> = registry
            .list_ordered_by_recency()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["Chat 2026-01-15 10:05:00", "Chat 2026-01-15 10:00:00"]);
    }

    #[test]
    fn test_recency_is_strictly_descending() {
        let registry = registry_with(&[(9, 0, 1), (23, 59, 59), (0, 0, 0), (12, 30, 0), (9, 0, 0)]);
        let ordered = registry.list_ordered_by_recency();
        assert_eq!(ordered.len(), 5);
        for pair in ordered.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
    }

    #[test]
    fn test_same_second_creation_is_disambiguated() {
        let mut registry = SessionRegistry::new();
        let first = registry.create_at(at(10, 0, 0));
        registry.insert_front(first);
        let second = registry.create_at(at(10, 0, 0));
        registry.insert_front(second);
        let third = registry.create_at(at(10, 0, 0));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Chat 2026-01-15 10:00:00"));
        assert!(registry.contains("Chat 2026-01-15 10:00:00 #2"));
        assert_eq!(third.id, "Chat 2026-01-15 10:00:00 #3");

        // Ties on created_at fall back to identifier order.
        let ordered = registry.list_ordered_by_recency();
        assert_eq!(ordered[0].id, "Chat 2026-01-15 10:00:00 #2");
    }

    #[test]
    fn test_insert_front_orders_iteration() {
        let registry = registry_with(&[(10, 0, 0), (11, 0, 0)]);
        let first = registry.iter().next().unwrap();
        assert_eq!(first.id, "Chat 2026-01-15 11:00:00");
    }

    #[test]
    fn test_insert_front_replaces_same_id() {
        let mut registry = registry_with(&[(10, 0, 0)]);
        let mut replacement = Session::new("Chat 2026-01-15 10:00:00", at(10, 0, 0).with_timezone(&Utc));
        replacement.messages.push(Message::user("again"));
        registry.insert_front(replacement);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Chat 2026-01-15 10:00:00").unwrap().messages.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut registry = registry_with(&[(10, 0, 0), (11, 0, 0)]);
        let removed = registry.delete("Chat 2026-01-15 10:00:00").unwrap();
        assert_eq!(removed.id, "Chat 2026-01-15 10:00:00");
        assert_eq!(registry.len(), 1);
        assert!(registry.delete("Chat 2026-01-15 10:00:00").is_none());
    }

    #[test]
    fn test_clear_all_leaves_one_empty_session() {
        let mut registry = registry_with(&[(10, 0, 0), (11, 0, 0), (12, 0, 0)]);
        registry
            .get_mut("Chat 2026-01-15 11:00:00")
            .unwrap()
            .messages
            .push(Message::user("hello"));

        let id = registry.clear_all_at(at(13, 0, 0));
        assert_eq!(registry.len(), 1);
        assert_eq!(id, "Chat 2026-01-15 13:00:00");
        assert!(registry.get(&id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_from_stored_sorts_and_roundtrips() {
        let registry = registry_with(&[(10, 0, 0), (10, 5, 0)]);
        let stored = registry.to_stored();

        let load = SessionRegistry::from_stored(stored.clone());
        assert!(load.malformed.is_empty());
        assert_eq!(load.registry.len(), 2);
        assert_eq!(load.registry.iter().next().unwrap().id, "Chat 2026-01-15 10:05:00");
        assert_eq!(load.registry.to_stored(), stored);
    }

    #[test]
    fn test_legacy_entries_derive_timestamp_from_id() {
        let mut stored = HistoryMap::new();
        stored.insert(
            "Chat 2026-01-15 10:00:00".to_string(),
            StoredSession::Legacy(vec![Message::user("old")]),
        );
        stored.insert(
            "Chat 2026-01-15 10:05:00".to_string(),
            StoredSession::Legacy(vec![]),
        );

        let load = SessionRegistry::from_stored(stored);
        let ordered = load.registry.list_ordered_by_recency();
        assert_eq!(ordered[0].id, "Chat 2026-01-15 10:05:00");
        assert_eq!(ordered[1].created_at, at(10, 0, 0).with_timezone(&Utc));
    }

    #[test]
    fn test_malformed_entries_are_quarantined_not_dropped() {
        let mut stored = HistoryMap::new();
        stored.insert(
            "Chat 2026-01-15 10:00:00".to_string(),
            StoredSession::Legacy(vec![Message::user("fine")]),
        );
        stored.insert(
            "notes from tuesday".to_string(),
            StoredSession::Legacy(vec![Message::user("precious")]),
        );

        let load = SessionRegistry::from_stored(stored.clone());
        assert_eq!(load.registry.len(), 1);
        assert_eq!(load.malformed.len(), 1);
        assert!(matches!(
            &load.malformed[0],
            ChatError::MalformedIdentifier { id, .. } if id == "notes from tuesday"
        ));
        assert!(!load.registry.contains("notes from tuesday"));

        let written = load.registry.to_stored();
        assert_eq!(
            written.get("notes from tuesday"),
            stored.get("notes from tuesday")
        );
    }

    #[test]
    fn test_unreadable_entry_is_quarantined() {
        let mut stored = HistoryMap::new();
        stored.insert(
            "Chat 2026-01-15 10:00:00".to_string(),
            StoredSession::Legacy(vec![Message::user("fine")]),
        );
        let odd = StoredSession::Unreadable(serde_json::json!([{"role": "system"}]));
        stored.insert("Chat 2026-01-15 10:05:00".to_string(), odd.clone());

        let load = SessionRegistry::from_stored(stored);
        assert_eq!(load.registry.len(), 1);
        assert!(matches!(
            &load.malformed[0],
            ChatError::UnreadableEntry { id, .. } if id == "Chat 2026-01-15 10:05:00"
        ));
        assert_eq!(
            load.registry.to_stored().get("Chat 2026-01-15 10:05:00"),
            Some(&odd)
        );
    }

    #[test]
    fn test_invalid_ordinal_is_quarantined() {
        let mut stored = HistoryMap::new();
        stored.insert(
            "Chat 2026-01-15 10:00:00 #1".to_string(),
            StoredSession::Legacy(vec![]),
        );
        let load = SessionRegistry::from_stored(stored);
        assert_eq!(load.malformed.len(), 1);
        let session = load.registry.create_at(at(10, 0, 0));
        assert_eq!(session.id, "Chat 2026-01-15 10:00:00");
    }

    #[test]
    fn test_get_or_create() {
        let mut registry = registry_with(&[(10, 0, 0)]);
        let existing = registry.get_or_create("Chat 2026-01-15 10:00:00").id.clone();
        assert_eq!(existing, "Chat 2026-01-15 10:00:00");
        assert_eq!(registry.len(), 1);

        let minted = registry.get_or_create("gone").id.clone();
        assert_ne!(minted, "gone");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().next().unwrap().id, minted);
    }

    #[test]
    fn test_most_recent() {
        let registry = registry_with(&[(12, 0, 0), (9, 0, 0)]);
        assert_eq!(registry.most_recent().unwrap().id, "Chat 2026-01-15 12:00:00");
        assert!(SessionRegistry::new().most_recent().is_none());
    }
}
