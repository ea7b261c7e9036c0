use serde::Deserialize;

// ── Wire vocabularies ────────────────────────────────────────────────────────

/// Approval category labels as Gerrit puts them on the wire.
pub mod approval_types {
    pub const VERIFIED: &str = "VRIF";
    pub const CODE_REVIEW: &str = "CRVW";
}

/// The event kinds the relay routes. `as_str` values double as the keys used
/// in the channel-map `events:` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    PatchsetCreated,
    ChangeMerged,
    CommentAdded,
    RefUpdated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PatchsetCreated => "patchset-created",
            Self::ChangeMerged => "change-merged",
            Self::CommentAdded => "comment-added",
            Self::RefUpdated => "ref-updated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Record fragments ─────────────────────────────────────────────────────────

/// The change a review event refers to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    pub project: Option<String>,
    pub branch: Option<String>,
    pub subject: Option<String>,
    pub url: Option<String>,
}

/// A Gerrit account reference (uploader, submitter, author).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchSet {
    /// Gerrit serializes the patch-set number as a string.
    pub number: Option<String>,
    pub revision: Option<String>,
    pub uploader: Option<Account>,
}

/// A reviewer score attached to a comment-added event.
#[derive(Debug, Clone, Deserialize)]
pub struct Approval {
    #[serde(rename = "type")]
    pub kind: String,
    /// Signed score, serialized by Gerrit as a string ("-2" … "2").
    pub value: String,
}

impl Approval {
    /// Parse the score. `None` when the wire value is not an integer.
    pub fn score(&self) -> Option<i32> {
        self.value.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefUpdate {
    pub project: Option<String>,
    #[serde(rename = "refName")]
    pub ref_name: Option<String>,
}

// ── Events ───────────────────────────────────────────────────────────────────

/// One record from the Gerrit event stream.
///
/// Fields are all optional: a record that decodes but is missing something a
/// downstream stage needs resolves to "no recipients" there instead of
/// failing the stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    #[serde(rename = "patchset-created")]
    PatchsetCreated {
        change: Option<Change>,
        #[serde(rename = "patchSet")]
        patch_set: Option<PatchSet>,
    },

    #[serde(rename = "change-merged")]
    ChangeMerged {
        change: Option<Change>,
        submitter: Option<Account>,
    },

    #[serde(rename = "comment-added")]
    CommentAdded {
        change: Option<Change>,
        author: Option<Account>,
        #[serde(default)]
        approvals: Vec<Approval>,
    },

    #[serde(rename = "ref-updated")]
    RefUpdated {
        submitter: Option<Account>,
        #[serde(rename = "refUpdate")]
        ref_update: Option<RefUpdate>,
    },

    /// Any event type we do not route. Decodes successfully so the stream
    /// reader can skip it without treating it as an error.
    #[serde(other)]
    Unknown,
}

impl ReviewEvent {
    /// The routed kind, `None` for [`ReviewEvent::Unknown`].
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::PatchsetCreated { .. } => Some(EventKind::PatchsetCreated),
            Self::ChangeMerged { .. } => Some(EventKind::ChangeMerged),
            Self::CommentAdded { .. } => Some(EventKind::CommentAdded),
            Self::RefUpdated { .. } => Some(EventKind::RefUpdated),
            Self::Unknown => None,
        }
    }

    /// The change record, for the kinds that carry one.
    pub fn change(&self) -> Option<&Change> {
        match self {
            Self::PatchsetCreated { change, .. }
            | Self::ChangeMerged { change, .. }
            | Self::CommentAdded { change, .. } => change.as_ref(),
            Self::RefUpdated { .. } | Self::Unknown => None,
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.change().and_then(|c| c.project.as_deref())
    }

    pub fn branch(&self) -> Option<&str> {
        self.change().and_then(|c| c.branch.as_deref())
    }
}
