use time::UtcDateTime;

/// A published piece of content.
///
/// Associations to authors, media and terms are held by identifier only. The
/// referenced records may or may not have been cached yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Post {
    /// Remote identifier (primary key)
    pub id: u64,
    pub slug: Option<String>,
    /// Publication status (e.g. `publish`, `draft`)
    pub status: Option<String>,
    /// Canonical URL
    pub link: Option<String>,
    pub title: Option<String>,
    /// Rendered HTML body
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub published_at: Option<UtcDateTime>,
    pub modified_at: Option<UtcDateTime>,
    /// Identifier of the authoring [`Author`](crate::Author)
    pub author: Option<u64>,
    /// Identifier of the featured [`Media`](crate::Media)
    pub featured_media: Option<u64>,
    /// Identifiers of every [`Term`](crate::Term) attached to this post.
    ///
    /// `Some(vec![])` explicitly clears the terms, `None` leaves them alone.
    pub terms: Option<Vec<u64>>,
}
impl Post {
    pub fn new(id: u64) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_author(mut self, author: u64) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_featured_media(mut self, media: u64) -> Self {
        self.featured_media = Some(media);
        self
    }

    pub fn with_terms(mut self, terms: impl IntoIterator<Item = u64>) -> Self {
        self.terms = Some(terms.into_iter().collect());
        self
    }

    pub fn published_at(mut self, published_at: UtcDateTime) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_only_sets_requested_fields() {
        let post = Post::new(7).with_title("Hello").with_terms([3, 1]);
        assert_eq!(post.id, 7);
        assert_eq!(post.title.as_deref(), Some("Hello"));
        assert_eq!(post.terms, Some(vec![3, 1]));
        assert!(post.content.is_none());
        assert!(post.author.is_none());
    }
}
