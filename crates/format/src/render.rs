use std::collections::BTreeSet;

use {
    reviewrelay_event::{Approval, Change, ReviewEvent, approval_types},
    reviewrelay_routing::RoutingTable,
    tracing::debug,
};

/// One rendered message bound for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    pub text: String,
}

/// An approval score that earns its own notification, gated on the channel
/// also subscribing to the synthetic `key` in the channel map.
struct ApprovalRule {
    kind: &'static str,
    score: i32,
    key: &'static str,
    lead: &'static str,
    outcome: &'static str,
}

/// Exactly four threshold rules; other scores never notify.
const APPROVAL_RULES: [ApprovalRule; 4] = [
    ApprovalRule {
        kind: approval_types::VERIFIED,
        score: -2,
        key: "x-vrif-minus-2",
        lead: "Verification of a change to",
        outcome: "failed",
    },
    ApprovalRule {
        kind: approval_types::VERIFIED,
        score: 2,
        key: "x-vrif-plus-2",
        lead: "Verification of a change to",
        outcome: "succeeded",
    },
    ApprovalRule {
        kind: approval_types::CODE_REVIEW,
        score: -2,
        key: "x-crvw-minus-2",
        lead: "A change to",
        outcome: "has been rejected",
    },
    ApprovalRule {
        kind: approval_types::CODE_REVIEW,
        score: 2,
        key: "x-crvw-plus-2",
        lead: "A change to",
        outcome: "has been approved",
    },
];

/// Render `event` for the channels `match_event` already selected.
///
/// The approval extras are a filter on that recipient set, not a second
/// routing pass: a channel subscribed to a synthetic key that is not a base
/// recipient gets nothing.
pub fn render(
    event: &ReviewEvent,
    recipients: &BTreeSet<String>,
    table: &RoutingTable,
) -> Vec<Notification> {
    let mut out = Vec::new();
    for channel in recipients {
        match event {
            ReviewEvent::PatchsetCreated { change, patch_set } => {
                let uploader = patch_set
                    .as_ref()
                    .and_then(|ps| ps.uploader.as_ref())
                    .and_then(|who| who.name.as_deref());
                let (Some(uploader), Some((project, subject, url))) =
                    (uploader, change_fields(change.as_ref()))
                else {
                    debug!(channel, "patchset-created event missing fields, dropping");
                    continue;
                };
                out.push(Notification {
                    channel: channel.clone(),
                    text: format!("{uploader} proposed {project}: {subject}  {url}"),
                });
            },

            ReviewEvent::RefUpdated {
                submitter,
                ref_update,
            } => {
                let Some(update) = ref_update.as_ref() else {
                    debug!(channel, "ref-updated event missing refUpdate, dropping");
                    continue;
                };
                // Only tag refs notify; branch updates and everything else
                // under refs/ stay silent.
                let Some(tag) = update
                    .ref_name
                    .as_deref()
                    .and_then(|name| name.strip_prefix("refs/tags/"))
                else {
                    continue;
                };
                let (Some(submitter), Some(project)) = (
                    submitter.as_ref().and_then(|who| who.username.as_deref()),
                    update.project.as_deref(),
                ) else {
                    debug!(channel, "ref-updated event missing fields, dropping");
                    continue;
                };
                out.push(Notification {
                    channel: channel.clone(),
                    text: format!("{submitter} tagged project {project} with {tag}"),
                });
            },

            ReviewEvent::CommentAdded {
                change, approvals, ..
            } => {
                let Some((project, subject, url)) = change_fields(change.as_ref()) else {
                    debug!(channel, "comment-added event missing fields, dropping");
                    continue;
                };
                out.push(Notification {
                    channel: channel.clone(),
                    text: format!(
                        "A comment has been added to a proposed change to \
                         {project}: {subject}  {url}"
                    ),
                });
                out.extend(approval_extras(
                    channel, approvals, project, subject, url, table,
                ));
            },

            ReviewEvent::ChangeMerged { change, .. } => {
                let Some((project, subject, url)) = change_fields(change.as_ref()) else {
                    debug!(channel, "change-merged event missing fields, dropping");
                    continue;
                };
                out.push(Notification {
                    channel: channel.clone(),
                    text: format!("Merged {project}: {subject}  {url}"),
                });
            },

            ReviewEvent::Unknown => {},
        }
    }
    out
}

fn approval_extras(
    channel: &str,
    approvals: &[Approval],
    project: &str,
    subject: &str,
    url: &str,
    table: &RoutingTable,
) -> Vec<Notification> {
    let mut out = Vec::new();
    for approval in approvals {
        let Some(score) = approval.score() else {
            continue;
        };
        for rule in &APPROVAL_RULES {
            if approval.kind == rule.kind
                && score == rule.score
                && table.subscribes(channel, rule.key)
            {
                out.push(Notification {
                    channel: channel.to_string(),
                    text: format!(
                        "{lead} {project} {outcome}: {subject}  {url}",
                        lead = rule.lead,
                        outcome = rule.outcome,
                    ),
                });
            }
        }
    }
    out
}

fn change_fields(change: Option<&Change>) -> Option<(&str, &str, &str)> {
    let change = change?;
    Some((
        change.project.as_deref()?,
        change.subject.as_deref()?,
        change.url.as_deref()?,
    ))
}
