use std::collections::{BTreeMap, BTreeSet};

use {
    reviewrelay_config::{ChannelSubscriptions, normalize_channel},
    reviewrelay_event::{EventKind, ReviewEvent},
};

/// Precomputed event-attribute → channel-set lookups.
///
/// Three independent buckets: event key, project, branch. A channel lands in
/// every bucket it declares, and matching intersects the three lookups.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    events: BTreeMap<String, BTreeSet<String>>,
    projects: BTreeMap<String, BTreeSet<String>>,
    branches: BTreeMap<String, BTreeSet<String>>,
}

impl RoutingTable {
    /// Build the table from channel-map entries. Channel names are normalized
    /// here as well, so the invariant holds no matter where the entries came
    /// from. Input order does not matter.
    pub fn build<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = (String, ChannelSubscriptions)>,
    {
        let mut table = Self::default();
        for (name, subs) in routes {
            let channel = normalize_channel(&name);
            for event in subs.events {
                table
                    .events
                    .entry(event)
                    .or_default()
                    .insert(channel.clone());
            }
            for project in subs.projects {
                table
                    .projects
                    .entry(project)
                    .or_default()
                    .insert(channel.clone());
            }
            for branch in subs.branches {
                table
                    .branches
                    .entry(branch)
                    .or_default()
                    .insert(channel.clone());
            }
        }
        table
    }

    /// Every channel mentioned anywhere in the table — the session's join
    /// list.
    pub fn channels(&self) -> BTreeSet<String> {
        self.events
            .values()
            .chain(self.projects.values())
            .chain(self.branches.values())
            .flatten()
            .cloned()
            .collect()
    }

    /// The channels that want this event.
    ///
    /// `ref-updated` routes by event key alone — project and branch are
    /// deliberately ignored for that kind (long-standing behavior; tag
    /// pushes are treated as global). Everything else is the intersection of
    /// the project, event-key, and branch buckets, where an absent event
    /// field or unknown key yields the empty set.
    pub fn match_event(&self, event: &ReviewEvent) -> BTreeSet<String> {
        let Some(kind) = event.kind() else {
            return BTreeSet::new();
        };

        if kind == EventKind::RefUpdated {
            return self.events.get(kind.as_str()).cloned().unwrap_or_default();
        }

        let (Some(project), Some(branch)) = (event.project(), event.branch()) else {
            return BTreeSet::new();
        };
        let (Some(by_project), Some(by_kind), Some(by_branch)) = (
            self.projects.get(project),
            self.events.get(kind.as_str()),
            self.branches.get(branch),
        ) else {
            return BTreeSet::new();
        };

        by_project
            .intersection(by_kind)
            .filter(|channel| by_branch.contains(*channel))
            .cloned()
            .collect()
    }

    /// Is `channel` subscribed to `key` in the events bucket? Used for the
    /// synthetic approval-threshold keys.
    pub fn subscribes(&self, channel: &str, key: &str) -> bool {
        self.events
            .get(key)
            .is_some_and(|set| set.contains(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(events: &[&str], projects: &[&str], branches: &[&str]) -> ChannelSubscriptions {
        ChannelSubscriptions {
            events: events.iter().map(|s| s.to_string()).collect(),
            projects: projects.iter().map(|s| s.to_string()).collect(),
            branches: branches.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sample_table() -> RoutingTable {
        RoutingTable::build([
            (
                "release".to_string(),
                subs(&["patchset-created"], &["myproj"], &["main"]),
            ),
            (
                "#qa".to_string(),
                subs(
                    &["comment-added", "x-crvw-minus-2", "ref-updated"],
                    &["myproj"],
                    &["main", "stable"],
                ),
            ),
        ])
    }

    fn patchset(project: &str, branch: &str) -> ReviewEvent {
        let line = format!(
            r#"{{"type": "patchset-created",
                "change": {{"project": "{project}", "branch": "{branch}",
                            "subject": "fix bug", "url": "http://x/1"}},
                "patchSet": {{"uploader": {{"name": "Alice"}}}}}}"#
        );
        reviewrelay_event::decode_line(&line).unwrap()
    }

    #[test]
    fn intersection_selects_the_configured_channel() {
        let table = sample_table();
        let matched = table.match_event(&patchset("myproj", "main"));
        assert_eq!(matched.into_iter().collect::<Vec<_>>(), vec!["#release"]);
    }

    #[test]
    fn wrong_project_or_branch_matches_nothing() {
        let table = sample_table();
        assert!(table.match_event(&patchset("otherproj", "main")).is_empty());
        assert!(table.match_event(&patchset("myproj", "stable")).is_empty());
    }

    #[test]
    fn matching_is_deterministic() {
        let table = sample_table();
        let event = patchset("myproj", "main");
        let first = table.match_event(&event);
        for _ in 0..10 {
            assert_eq!(table.match_event(&event), first);
        }
    }

    #[test]
    fn build_order_does_not_matter() {
        let forward = sample_table();
        let reversed = RoutingTable::build([
            (
                "#qa".to_string(),
                subs(
                    &["comment-added", "x-crvw-minus-2", "ref-updated"],
                    &["myproj"],
                    &["main", "stable"],
                ),
            ),
            (
                "release".to_string(),
                subs(&["patchset-created"], &["myproj"], &["main"]),
            ),
        ]);
        let event = patchset("myproj", "main");
        assert_eq!(forward.match_event(&event), reversed.match_event(&event));
        assert_eq!(forward.channels(), reversed.channels());
    }

    #[test]
    fn channel_names_are_normalized() {
        let table = sample_table();
        assert_eq!(
            table.channels().into_iter().collect::<Vec<_>>(),
            vec!["#qa", "#release"],
        );
    }

    #[test]
    fn missing_branch_field_matches_nothing() {
        let table = sample_table();
        let event = reviewrelay_event::decode_line(
            r#"{"type": "patchset-created", "change": {"project": "myproj"}}"#,
        )
        .unwrap();
        assert!(table.match_event(&event).is_empty());
    }

    #[test]
    fn ref_updated_routes_by_event_key_alone() {
        let table = sample_table();
        let event = reviewrelay_event::decode_line(
            r#"{"type": "ref-updated",
                "submitter": {"username": "bob"},
                "refUpdate": {"project": "unconfigured-project",
                              "refName": "refs/tags/v1.0"}}"#,
        )
        .unwrap();
        assert_eq!(
            table.match_event(&event).into_iter().collect::<Vec<_>>(),
            vec!["#qa"],
        );
    }

    #[test]
    fn unknown_event_kind_matches_nothing() {
        let table = sample_table();
        let event =
            reviewrelay_event::decode_line(r#"{"type": "topic-changed", "change": {}}"#).unwrap();
        assert!(table.match_event(&event).is_empty());
    }

    #[test]
    fn subscribes_checks_the_events_bucket() {
        let table = sample_table();
        assert!(table.subscribes("#qa", "x-crvw-minus-2"));
        assert!(!table.subscribes("#release", "x-crvw-minus-2"));
        assert!(!table.subscribes("#qa", "x-vrif-plus-2"));
    }
}
