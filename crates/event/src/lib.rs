//! Typed Gerrit event-stream records.
//!
//! The `gerrit stream-events` feed emits one JSON object per line. Everything
//! the relay touches is declared here; unknown event types decode to
//! [`ReviewEvent::Unknown`] and unknown fields are ignored, so a newer Gerrit
//! never breaks decoding.

pub mod model;

pub use model::{
    Account, Approval, Change, EventKind, PatchSet, RefUpdate, ReviewEvent, approval_types,
};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The line was not a JSON object we can decode.
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),

    /// The line was empty or whitespace.
    #[error("empty event line")]
    EmptyLine,
}

/// Decode one line of the event stream.
pub fn decode_line(line: &str) -> Result<ReviewEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::EmptyLine);
    }
    Ok(serde_json::from_str(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_patchset_created() {
        let line = r#"{
            "type": "patchset-created",
            "change": {"project": "nova", "branch": "master",
                       "subject": "Fix it", "url": "https://review/1"},
            "patchSet": {"number": "3", "uploader": {"name": "Alice"}},
            "eventCreatedOn": 1354912341
        }"#;
        let event = decode_line(line).unwrap();
        let ReviewEvent::PatchsetCreated { change, patch_set } = event else {
            panic!("wrong variant: {event:?}");
        };
        assert_eq!(change.unwrap().project.as_deref(), Some("nova"));
        let uploader = patch_set.unwrap().uploader.unwrap();
        assert_eq!(uploader.name.as_deref(), Some("Alice"));
    }

    #[test]
    fn unknown_event_type_is_not_an_error() {
        let event = decode_line(r#"{"type": "reviewer-added", "change": {}}"#).unwrap();
        assert!(matches!(event, ReviewEvent::Unknown));
    }

    #[test]
    fn missing_fields_decode_to_none() {
        let event = decode_line(r#"{"type": "change-merged"}"#).unwrap();
        let ReviewEvent::ChangeMerged { change, submitter } = event else {
            panic!("wrong variant");
        };
        assert!(change.is_none());
        assert!(submitter.is_none());
    }

    #[test]
    fn approvals_default_to_empty() {
        let event = decode_line(
            r#"{"type": "comment-added", "change": {"project": "p"}, "author": {}}"#,
        )
        .unwrap();
        let ReviewEvent::CommentAdded { approvals, .. } = event else {
            panic!("wrong variant");
        };
        assert!(approvals.is_empty());
    }

    #[test]
    fn rejects_garbage_and_empty_lines() {
        assert!(matches!(decode_line("   "), Err(Error::EmptyLine)));
        assert!(matches!(decode_line("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn approval_score_parses_signed_values() {
        let approval = Approval {
            kind: approval_types::VERIFIED.into(),
            value: "-2".into(),
        };
        assert_eq!(approval.score(), Some(-2));
        let approval = Approval {
            kind: approval_types::CODE_REVIEW.into(),
            value: "2".into(),
        };
        assert_eq!(approval.score(), Some(2));
        let approval = Approval {
            kind: approval_types::CODE_REVIEW.into(),
            value: "nope".into(),
        };
        assert_eq!(approval.score(), None);
    }
}
