// Keeps the event -> match -> map tree free of empty parents while invalid maps are removed.
//
// Nothing in storage enforces the references between the three collections, so this is the
// only place that knows a match without maps, or an event without matches, must not exist.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::DatasetError;
use crate::model::{EventId, Events, MapId, MatchId, Matches};

#[derive(Debug, Clone, PartialEq)]
pub struct EventTree {
    events: Events,
    matches: Matches,
    // match -> the single event listing it
    owners: BTreeMap<MatchId, EventId>,
}

/// What a call to `remove_invalid_maps` took out of the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pruned {
    pub map_refs_removed: usize,
    pub matches_deleted: Vec<MatchId>,
    pub events_deleted: Vec<EventId>,
}

impl Pruned {
    pub fn is_empty(&self) -> bool {
        self.map_refs_removed == 0
    }
}

impl EventTree {
    /// Fails if a match is listed by more than one event, or twice by the same one.
    /// Matches no event lists are allowed.
    pub fn new(events: Events, matches: Matches) -> Result<Self, DatasetError> {
        let mut owners = BTreeMap::new();

        for (&event_id, event) in &events {
            for &match_id in &event.match_ids {
                if let Some(first) = owners.insert(match_id, event_id) {
                    return Err(DatasetError::MatchOwnedTwice { match_id, first, second: event_id });
                }
            }
        }

        Ok(Self { events, matches, owners })
    }

    pub fn events(&self) -> &Events { &self.events }
    pub fn matches(&self) -> &Matches { &self.matches }

    pub fn into_parts(self) -> (Matches, Events) {
        (self.matches, self.events)
    }

    /// Strips `invalid` from every match. A match left with no maps is deleted and unlisted
    /// from its event; an event left with no matches is deleted too. Only parents that were
    /// emptied by this call are touched, and running it again with the same ids does nothing.
    pub fn remove_invalid_maps(&mut self, invalid: &BTreeSet<MapId>) -> Pruned {
        let mut pruned = Pruned::default();
        let mut emptied = Vec::new();

        for (&match_id, m) in self.matches.iter_mut() {
            let before = m.map_ids.len();
            m.map_ids.retain(|id| !invalid.contains(id));

            let removed = before - m.map_ids.len();
            if removed == 0 { continue; }

            pruned.map_refs_removed += removed;
            if m.map_ids.is_empty() {
                emptied.push(match_id);
            }
        }

        for match_id in emptied {
            self.matches.remove(&match_id);
            pruned.matches_deleted.push(match_id);

            let Some(event_id) = self.owners.remove(&match_id) else {
                debug!(match_id, "deleted match had no owning event");
                continue;
            };
            let Some(event) = self.events.get_mut(&event_id) else {
                continue;
            };

            event.match_ids.retain(|&id| id != match_id);
            if event.match_ids.is_empty() {
                self.events.remove(&event_id);
                pruned.events_deleted.push(event_id);
            }
        }

        if !pruned.is_empty() {
            info!(
                map_refs = pruned.map_refs_removed,
                matches = pruned.matches_deleted.len(),
                events = pruned.events_deleted.len(),
                "invalid maps removed"
            );
        }

        pruned
    }
}

/// One-shot form of `EventTree::remove_invalid_maps` over plain collections.
pub fn remove_invalid_maps(invalid: &BTreeSet<MapId>, matches: Matches, events: Events) -> Result<(Matches, Events), DatasetError> {
    let mut tree = EventTree::new(events, matches)?;
    tree.remove_invalid_maps(invalid);
    Ok(tree.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, Match, TeamPair};

    fn m(map_ids: &[MapId]) -> Match {
        Match { teams: TeamPair::new(4608, 5995), date: None, map_ids: map_ids.to_vec() }
    }

    fn ev(name: &str, match_ids: &[MatchId]) -> Event {
        Event { name: name.to_string(), match_ids: match_ids.to_vec() }
    }

    fn ids(ids: &[MapId]) -> BTreeSet<MapId> {
        ids.iter().copied().collect()
    }

    // E1 = {M1, M2}, E2 = {M3}; M1 = {X, Y}, M2 = {Z}, M3 = {W}
    fn sample() -> EventTree {
        let events = Events::from([(1, ev("Major", &[11, 12])), (2, ev("RMR", &[13]))]);
        let matches = Matches::from([(11, m(&[100, 101])), (12, m(&[102])), (13, m(&[103]))]);
        EventTree::new(events, matches).unwrap()
    }

    fn assert_no_empty_parents(tree: &EventTree) {
        assert!(tree.matches().values().all(|m| !m.map_ids.is_empty()));
        assert!(tree.events().values().all(|e| !e.match_ids.is_empty()));
    }

    #[test]
    fn emptied_match_and_event_cascade() {
        let events = Events::from([(1, ev("Major", &[11]))]);
        let matches = Matches::from([(11, m(&[100, 101]))]);

        let (matches, events) = remove_invalid_maps(&ids(&[100, 101]), matches, events).unwrap();
        assert!(matches.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn partial_invalidation_keeps_parents() {
        let events = Events::from([(1, ev("Major", &[11]))]);
        let matches = Matches::from([(11, m(&[100, 101]))]);

        let (matches, events) = remove_invalid_maps(&ids(&[100]), matches, events).unwrap();
        assert_eq!(matches[&11].map_ids, vec![101]);
        assert_eq!(events[&1].match_ids, vec![11]);
    }

    #[test]
    fn event_survives_while_a_sibling_match_remains() {
        let mut tree = sample();
        let pruned = tree.remove_invalid_maps(&ids(&[102]));

        assert_eq!(pruned.matches_deleted, vec![12]);
        assert!(pruned.events_deleted.is_empty());
        assert_eq!(tree.events()[&1].match_ids, vec![11]);
        assert!(tree.matches().contains_key(&11));
        assert_no_empty_parents(&tree);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut once = sample();
        let first = once.remove_invalid_maps(&ids(&[100, 101, 103]));
        assert_eq!(first.map_refs_removed, 3);
        assert_eq!(first.events_deleted, vec![2]);

        let mut twice = once.clone();
        let second = twice.remove_invalid_maps(&ids(&[100, 101, 103]));
        assert!(second.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_ids_change_nothing() {
        let mut tree = sample();
        let before = tree.clone();

        assert!(tree.remove_invalid_maps(&ids(&[999, 1000])).is_empty());
        assert_eq!(tree, before);
    }

    #[test]
    fn no_empty_parents_for_any_subset() {
        let all = [100, 101, 102, 103];
        for mask in 0u32..16 {
            let invalid: BTreeSet<MapId> = all.iter().enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, &id)| id)
                .collect();

            let mut tree = sample();
            tree.remove_invalid_maps(&invalid);
            assert_no_empty_parents(&tree);

            let surviving: BTreeSet<MapId> = tree.matches().values().flat_map(|m| m.map_ids.iter().copied()).collect();
            assert!(surviving.is_disjoint(&invalid));
            assert_eq!(surviving.len(), all.len() - invalid.len());
        }
    }

    #[test]
    fn orphan_match_is_deleted_without_touching_events() {
        let events = Events::from([(1, ev("Major", &[11]))]);
        let matches = Matches::from([(11, m(&[100])), (99, m(&[200]))]);

        let (matches, events) = remove_invalid_maps(&ids(&[200]), matches, events).unwrap();
        assert!(!matches.contains_key(&99));
        assert_eq!(events[&1].match_ids, vec![11]);
    }

    #[test]
    fn already_empty_matches_are_left_alone() {
        let events = Events::from([(1, ev("Major", &[11, 12]))]);
        let matches = Matches::from([(11, m(&[100])), (12, m(&[]))]);

        let (matches, _) = remove_invalid_maps(&ids(&[555]), matches, events).unwrap();
        assert!(matches.contains_key(&12));
    }

    #[test]
    fn shared_match_is_rejected_up_front() {
        let events = Events::from([(1, ev("Major", &[11])), (2, ev("RMR", &[11]))]);
        let matches = Matches::from([(11, m(&[100]))]);

        let err = EventTree::new(events, matches).unwrap_err();
        assert!(matches!(err, DatasetError::MatchOwnedTwice { match_id: 11, first: 1, second: 2 }));
    }

    #[test]
    fn match_listed_twice_by_one_event_is_rejected() {
        let events = Events::from([(1, ev("Major", &[11, 11]))]);
        assert!(EventTree::new(events, Matches::new()).is_err());
    }
}
