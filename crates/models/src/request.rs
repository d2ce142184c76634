use crate::{Author, Media, Post, Term};
use time::UtcDateTime;

/// Everything fetched by one successful sync round, handed to the cache in a
/// single piece.
///
/// The cache consumes the request by value and returns it untouched on
/// success, so the caller can keep using the records without cloning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub posts: Vec<Post>,
    pub media: Vec<Media>,
    pub authors: Vec<Author>,
    pub terms: Vec<Term>,
    /// When the server responded with this data. Becomes the freshness
    /// watermark once the records are committed.
    pub last_fetched_at: UtcDateTime,
}
impl CacheRequest {
    pub fn new(last_fetched_at: UtcDateTime) -> Self {
        Self {
            posts: Vec::new(),
            media: Vec::new(),
            authors: Vec::new(),
            terms: Vec::new(),
            last_fetched_at,
        }
    }

    pub fn with_posts(mut self, posts: impl IntoIterator<Item = Post>) -> Self {
        self.posts.extend(posts);
        self
    }

    pub fn with_media(mut self, media: impl IntoIterator<Item = Media>) -> Self {
        self.media.extend(media);
        self
    }

    pub fn with_authors(mut self, authors: impl IntoIterator<Item = Author>) -> Self {
        self.authors.extend(authors);
        self
    }

    pub fn with_terms(mut self, terms: impl IntoIterator<Item = Term>) -> Self {
        self.terms.extend(terms);
        self
    }

    /// Total number of records across all four collections.
    pub fn len(&self) -> usize {
        self.posts.len() + self.media.len() + self.authors.len() + self.terms.len()
    }

    /// `true` when there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
