//! Repository over the four content tables and the sync watermarks.
//!
//! Content is only ever written through [`Repository::upsert`], which merges
//! a whole [`CacheRequest`] in one transaction. Records are never deleted one
//! by one: the whole namespace file is removed instead.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{AuthorRow, MediaRow, PostRow, TermRow, WatermarkRow, from_id, to_id};
use exn::ResultExt;
use feedstash_models::{Author, CacheRequest, Media, Post, Term};
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Watermark key shared by every content type a [`CacheRequest`] carries.
pub const CONTENT_WATERMARK: &str = "content";

/// Number of cached records per content type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub posts: u64,
    pub media: u64,
    pub authors: u64,
    pub terms: u64,
}
impl Counts {
    pub fn total(&self) -> u64 {
        self.posts + self.media + self.authors + self.terms
    }
}

/// Storage rows of one request, converted up front so that invalid data is
/// rejected before a transaction is opened.
struct Batch {
    posts: Vec<PostRow>,
    media: Vec<MediaRow>,
    authors: Vec<AuthorRow>,
    terms: Vec<TermRow>,
}
impl TryFrom<&CacheRequest> for Batch {
    type Error = crate::error::Error;
    fn try_from(request: &CacheRequest) -> Result<Self> {
        Ok(Self {
            posts: request.posts.iter().map(PostRow::try_from).collect::<Result<Vec<_>>>()?,
            media: request.media.iter().map(MediaRow::try_from).collect::<Result<Vec<_>>>()?,
            authors: request.authors.iter().map(AuthorRow::try_from).collect::<Result<Vec<_>>>()?,
            terms: request.terms.iter().map(TermRow::try_from).collect::<Result<Vec<_>>>()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Merge every record of `request` into the cache.
    ///
    /// All four collections are written in a single transaction: either all
    /// of them are committed or none are. An existing record only has the
    /// fields overwritten that the incoming record specifies.
    ///
    /// The watermark is *not* touched; see [`set_last_fetched_at`](Self::set_last_fetched_at).
    pub async fn upsert(&self, request: &CacheRequest) -> Result<()> {
        let batch = Batch::try_from(request)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in batch.posts {
            sqlx::query(include_str!("../queries/upsert_post.sql"))
                .bind(row.id)
                .bind(row.slug)
                .bind(row.status)
                .bind(row.link)
                .bind(row.title)
                .bind(row.content)
                .bind(row.excerpt)
                .bind(row.published_at)
                .bind(row.modified_at)
                .bind(row.author_id)
                .bind(row.featured_media_id)
                .bind(row.term_ids)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in batch.media {
            sqlx::query(include_str!("../queries/upsert_media.sql"))
                .bind(row.id)
                .bind(row.title)
                .bind(row.alt_text)
                .bind(row.caption)
                .bind(row.mime_type)
                .bind(row.source_url)
                .bind(row.width)
                .bind(row.height)
                .bind(row.published_at)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in batch.authors {
            sqlx::query(include_str!("../queries/upsert_author.sql"))
                .bind(row.id)
                .bind(row.name)
                .bind(row.slug)
                .bind(row.description)
                .bind(row.link)
                .bind(row.avatar_url)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in batch.terms {
            sqlx::query(include_str!("../queries/upsert_term.sql"))
                .bind(row.id)
                .bind(row.taxonomy)
                .bind(row.name)
                .bind(row.slug)
                .bind(row.description)
                .bind(row.parent_id)
                .bind(row.post_count)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Watermarks
    // =========================================================================

    /// When content of `type_key` was last fetched successfully, if ever.
    pub async fn last_fetched_at(&self, type_key: &str) -> Result<Option<UtcDateTime>> {
        let row: Option<WatermarkRow> = sqlx::query_as(include_str!("../queries/get_watermark.sql"))
            .bind(type_key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.last_fetched_at()).transpose()
    }

    /// Record a successful fetch, replacing any previous watermark.
    pub async fn set_last_fetched_at(&self, type_key: &str, last_fetched_at: UtcDateTime) -> Result<()> {
        self.set_watermark(WatermarkRow::new(type_key, last_fetched_at)?).await
    }

    pub(crate) async fn set_watermark(&self, row: WatermarkRow) -> Result<()> {
        sqlx::query(include_str!("../queries/set_watermark.sql"))
            .bind(row.type_key)
            .bind(row.last_fetched_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_post(&self, id: u64) -> Result<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(include_str!("../queries/get_post.sql"))
            .bind(to_id(id, "post id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    pub async fn get_media(&self, id: u64) -> Result<Option<Media>> {
        let row: Option<MediaRow> = sqlx::query_as(include_str!("../queries/get_media.sql"))
            .bind(to_id(id, "media id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    pub async fn get_author(&self, id: u64) -> Result<Option<Author>> {
        let row: Option<AuthorRow> = sqlx::query_as(include_str!("../queries/get_author.sql"))
            .bind(to_id(id, "author id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    pub async fn get_term(&self, id: u64) -> Result<Option<Term>> {
        let row: Option<TermRow> = sqlx::query_as(include_str!("../queries/get_term.sql"))
            .bind(to_id(id, "term id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Most recently published posts first. Posts without a publication date
    /// come last.
    pub async fn list_recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let limit = i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("limit"))?;
        let rows: Vec<PostRow> = sqlx::query_as(include_str!("../queries/list_recent_posts.sql"))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect::<Result<Vec<_>>>()
    }

    /// Posts filed under the given term, most recently published first.
    pub async fn list_posts_for_term(&self, term_id: u64) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(include_str!("../queries/list_posts_for_term.sql"))
            .bind(to_id(term_id, "term id")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect::<Result<Vec<_>>>()
    }

    pub async fn counts(&self) -> Result<Counts> {
        let (posts, media, authors, terms): (i64, i64, i64, i64) =
            sqlx::query_as(include_str!("../queries/counts.sql"))
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(Counts {
            posts: from_id(posts, "post count")?,
            media: from_id(media, "media count")?,
            authors: from_id(authors, "author count")?,
            terms: from_id(terms, "term count")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedstash_models::TermKind;
    use time::Duration;
    use time::macros::utc_datetime;

    const T1: UtcDateTime = utc_datetime!(2025-01-01 08:00:00);

    async fn repo() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    fn sample_request() -> CacheRequest {
        CacheRequest::new(T1)
            .with_posts([Post::new(1).with_title("Hello").with_author(10).with_featured_media(20).with_terms([30, 31])])
            .with_media([Media::new(20).with_source_url("https://example.com/a.jpg").with_dimensions(800, 600)])
            .with_authors([Author::new(10).with_name("Ada")])
            .with_terms([Term::category(30, "News"), Term::tag(31, "rust")])
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (db, repo) = repo().await;
        repo.upsert(&sample_request()).await.unwrap();

        let post = repo.get_post(1).await.unwrap().unwrap();
        assert_eq!(post.title.as_deref(), Some("Hello"));
        assert_eq!(post.author, Some(10));
        assert_eq!(post.featured_media, Some(20));
        assert_eq!(post.terms, Some(vec![30, 31]));
        let media = repo.get_media(20).await.unwrap().unwrap();
        assert_eq!(media.aspect_ratio(), Some(800.0 / 600.0));
        let author = repo.get_author(10).await.unwrap().unwrap();
        assert_eq!(author.name.as_deref(), Some("Ada"));
        let term = repo.get_term(31).await.unwrap().unwrap();
        assert_eq!(term.kind, TermKind::Tag);

        assert!(repo.get_post(2).await.unwrap().is_none());
        db.close().await;
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (db, repo) = repo().await;
        repo.upsert(&sample_request()).await.unwrap();
        repo.upsert(&sample_request()).await.unwrap();
        assert_eq!(repo.counts().await.unwrap(), Counts { posts: 1, media: 1, authors: 1, terms: 2 });
        assert_eq!(repo.get_post(1).await.unwrap().unwrap(), sample_request().posts[0]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_fields_keep_stored_values() {
        let (db, repo) = repo().await;
        repo.upsert(&sample_request()).await.unwrap();
        let update = CacheRequest::new(T1).with_posts([Post::new(1).with_content("<p>Body</p>")]);
        repo.upsert(&update).await.unwrap();

        let post = repo.get_post(1).await.unwrap().unwrap();
        assert_eq!(post.title.as_deref(), Some("Hello"));
        assert_eq!(post.content.as_deref(), Some("<p>Body</p>"));
        assert_eq!(post.terms, Some(vec![30, 31]));
        db.close().await;
    }

    #[tokio::test]
    async fn test_explicit_empty_terms_clear_them() {
        let (db, repo) = repo().await;
        repo.upsert(&sample_request()).await.unwrap();
        repo.upsert(&CacheRequest::new(T1).with_posts([Post::new(1).with_terms([])])).await.unwrap();
        assert_eq!(repo.get_post(1).await.unwrap().unwrap().terms, Some(vec![]));
        assert!(repo.list_posts_for_term(30).await.unwrap().is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_taxonomy_is_always_overwritten() {
        let (db, repo) = repo().await;
        repo.upsert(&CacheRequest::new(T1).with_terms([Term::category(5, "Misc")])).await.unwrap();
        repo.upsert(&CacheRequest::new(T1).with_terms([Term::new(5, TermKind::Tag)])).await.unwrap();
        let term = repo.get_term(5).await.unwrap().unwrap();
        assert_eq!(term.kind, TermKind::Tag);
        assert_eq!(term.name.as_deref(), Some("Misc"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_everything() {
        let (db, repo) = repo().await;
        repo.upsert(&sample_request()).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON terms WHEN NEW.name = 'boom' \
             BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let failing = CacheRequest::new(T1)
            .with_posts([Post::new(1).with_title("Changed"), Post::new(2)])
            .with_authors([Author::new(11)])
            .with_terms([Term::tag(99, "boom")]);
        let err = repo.upsert(&failing).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));

        assert_eq!(repo.get_post(1).await.unwrap().unwrap().title.as_deref(), Some("Hello"));
        assert_eq!(repo.counts().await.unwrap(), Counts { posts: 1, media: 1, authors: 1, terms: 2 });
        db.close().await;
    }

    #[tokio::test]
    async fn test_invalid_identifier_writes_nothing() {
        let (db, repo) = repo().await;
        let request = CacheRequest::new(T1).with_posts([Post::new(1), Post::new(u64::MAX)]);
        let err = repo.upsert(&request).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("post id")));
        assert_eq!(repo.counts().await.unwrap().total(), 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_watermark_round_trip() {
        let (db, repo) = repo().await;
        assert!(repo.last_fetched_at(CONTENT_WATERMARK).await.unwrap().is_none());
        let t2 = T1 + Duration::nanoseconds(123_456_789);
        repo.set_last_fetched_at(CONTENT_WATERMARK, T1).await.unwrap();
        repo.set_last_fetched_at(CONTENT_WATERMARK, t2).await.unwrap();
        assert_eq!(repo.last_fetched_at(CONTENT_WATERMARK).await.unwrap(), Some(t2));
        // Keys are independent.
        assert!(repo.last_fetched_at("media").await.unwrap().is_none());
        db.close().await;
    }

    #[tokio::test]
    async fn test_list_recent_posts() {
        let (db, repo) = repo().await;
        let request = CacheRequest::new(T1).with_posts([
            Post::new(1).published_at(T1),
            Post::new(2).published_at(T1 + Duration::days(2)),
            Post::new(3).published_at(T1 + Duration::days(1)),
            Post::new(4),
        ]);
        repo.upsert(&request).await.unwrap();
        let ids = |posts: Vec<Post>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(repo.list_recent_posts(10).await.unwrap()), [2, 3, 1, 4]);
        assert_eq!(ids(repo.list_recent_posts(2).await.unwrap()), [2, 3]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_list_posts_for_term() {
        let (db, repo) = repo().await;
        let request = CacheRequest::new(T1).with_posts([
            Post::new(1).with_terms([7, 8]).published_at(T1),
            Post::new(2).with_terms([8]).published_at(T1 + Duration::hours(1)),
            Post::new(3).with_terms([9]),
            Post::new(4),
        ]);
        repo.upsert(&request).await.unwrap();
        let ids = |posts: Vec<Post>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(repo.list_posts_for_term(8).await.unwrap()), [2, 1]);
        assert_eq!(ids(repo.list_posts_for_term(7).await.unwrap()), [1]);
        assert!(repo.list_posts_for_term(10).await.unwrap().is_empty());
        db.close().await;
    }
}
