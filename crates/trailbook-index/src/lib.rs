//! Cross-reference index for trailbook.
//!
//! Answers one question: given a set of candidate photo ids, which other
//! moments and sessions still use them? Purely derived from a graph
//! snapshot, with an ordering contract the presentation layer relies on.

mod refs;

pub use refs::{find_references, Anchor, CrossReference, ReferenceQuery};
