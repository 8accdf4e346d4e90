//! Subject identity: which tracked person the run follows.

use std::fmt;

use crate::tracker::{TrackId, TrackedBox};

/// The run's subject. Locked once, on the first frame the tracker reports
/// anyone, and never re-evaluated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SubjectIdentity {
    #[default]
    Unresolved,
    Locked(TrackId),
}

impl SubjectIdentity {
    pub fn identity(self) -> Option<TrackId> {
        match self {
            Self::Unresolved => None,
            Self::Locked(id) => Some(id),
        }
    }

    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

impl fmt::Display for SubjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Locked(id) => write!(f, "#{id}"),
        }
    }
}

/// Result of one selection step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub subject: SubjectIdentity,
    /// The subject's box on this frame, if the tracker reported it
    pub subject_box: Option<TrackedBox>,
}

/// Resolve the subject among this frame's tracked boxes.
///
/// While unresolved, the largest box (first one on ties) becomes the
/// subject; boxes with a non-finite corner or a non-positive side never
/// qualify. Once locked, only a box with the same identity is returned; a
/// frame without it yields no box and leaves the identity untouched, since
/// re-association after occlusion is the tracker's job.
pub fn select_subject(tracked: &[TrackedBox], subject: SubjectIdentity) -> Selection {
    let subject = match subject {
        SubjectIdentity::Locked(_) => subject,
        SubjectIdentity::Unresolved => largest(tracked)
            .map(|b| SubjectIdentity::Locked(b.identity))
            .unwrap_or(SubjectIdentity::Unresolved),
    };

    let subject_box = subject
        .identity()
        .and_then(|id| tracked.iter().find(|b| b.identity == id).copied());

    Selection {
        subject,
        subject_box,
    }
}

fn largest(tracked: &[TrackedBox]) -> Option<&TrackedBox> {
    tracked
        .iter()
        .filter(|b| b.rect().is_well_formed())
        .fold(None, |best: Option<&TrackedBox>, b| match best {
            Some(current) if current.area() >= b.area() => Some(current),
            _ => Some(b),
        })
}
