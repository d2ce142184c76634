//! Content records as delivered by the sync API.
//!
//! These are the external (network-side) representations of the four entity
//! kinds the offline cache knows about, plus the [`CacheRequest`] bundle the
//! sync layer hands over after each successful fetch. Every field besides the
//! primary identifier is optional: `None` means "this payload didn't say",
//! which the cache treats as "keep whatever is already stored".

mod author;
mod media;
mod post;
mod request;
mod term;

pub use crate::author::Author;
pub use crate::media::Media;
pub use crate::post::Post;
pub use crate::request::CacheRequest;
pub use crate::term::{Term, TermKind, UnknownTaxonomy};
