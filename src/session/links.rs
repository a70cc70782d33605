use std::collections::{BTreeMap, BTreeSet};

use crate::protocol::{LevelId, SessionId};

/// Which sessions are watching which level.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: BTreeMap<LevelId, BTreeSet<SessionId>>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the session was already subscribed.
    pub fn subscribe(&mut self, level: &str, session: SessionId) -> bool {
        self.links
            .entry(level.to_string())
            .or_default()
            .insert(session)
    }

    pub fn unsubscribe(&mut self, level: &str, session: SessionId) -> bool {
        let Some(sessions) = self.links.get_mut(level) else {
            return false;
        };
        let removed = sessions.remove(&session);
        if sessions.is_empty() {
            self.links.remove(level);
        }
        removed
    }

    /// Drop a session from every level it watches.
    pub fn unsubscribe_all(&mut self, session: SessionId) {
        self.links.retain(|_, sessions| {
            sessions.remove(&session);
            !sessions.is_empty()
        });
    }

    pub fn is_subscribed(&self, level: &str, session: SessionId) -> bool {
        self.links
            .get(level)
            .map_or(false, |sessions| sessions.contains(&session))
    }

    pub fn subscribers(&self, level: &str) -> Vec<SessionId> {
        self.links
            .get(level)
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Levels with at least one subscriber.
    pub fn watched_levels(&self) -> Vec<LevelId> {
        self.links.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_unsubscribe() {
        let mut links = LinkTable::new();
        assert!(links.subscribe("test", 1));
        assert!(!links.subscribe("test", 1));
        links.subscribe("test", 2);
        assert_eq!(links.subscribers("test"), vec![1, 2]);

        assert!(links.unsubscribe("test", 1));
        assert!(!links.unsubscribe("test", 1));
        assert!(!links.is_subscribed("test", 1));
        assert_eq!(links.watched_levels(), vec!["test".to_string()]);

        links.unsubscribe("test", 2);
        assert!(links.watched_levels().is_empty());
    }

    #[test]
    fn unsubscribe_all_clears_every_level() {
        let mut links = LinkTable::new();
        links.subscribe("a", 1);
        links.subscribe("b", 1);
        links.subscribe("b", 2);
        links.unsubscribe_all(1);
        assert_eq!(links.watched_levels(), vec!["b".to_string()]);
        assert_eq!(links.subscribers("b"), vec![2]);
        assert!(links.subscribers("a").is_empty());
    }
}
