use crate::error::{Error, ErrorKind};
use crate::models::{from_id, from_timestamp, to_id, to_timestamp};
use exn::ResultExt;
use feedstash_models::Post;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) slug: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) link: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) excerpt: Option<String>,
    pub(crate) published_at: Option<i64>,
    pub(crate) modified_at: Option<i64>,
    pub(crate) author_id: Option<i64>,
    pub(crate) featured_media_id: Option<i64>,
    /// JSON array of term identifiers.
    pub(crate) term_ids: Option<String>,
}
impl TryFrom<&Post> for PostRow {
    type Error = Error;
    fn try_from(post: &Post) -> Result<Self, Self::Error> {
        let term_ids = post
            .terms
            .as_ref()
            .map(|terms| -> Result<String, Error> {
                let ids = terms.iter().map(|&id| to_id(id, "post term id")).collect::<Result<Vec<_>, _>>()?;
                serde_json::to_string(&ids).or_raise(|| ErrorKind::InvalidData("post terms"))
            })
            .transpose()?;
        Ok(Self {
            id: to_id(post.id, "post id")?,
            slug: post.slug.clone(),
            status: post.status.clone(),
            link: post.link.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            published_at: post.published_at.map(|t| to_timestamp(t, "post published at")).transpose()?,
            modified_at: post.modified_at.map(|t| to_timestamp(t, "post modified at")).transpose()?,
            author_id: post.author.map(|id| to_id(id, "post author")).transpose()?,
            featured_media_id: post.featured_media.map(|id| to_id(id, "post featured media")).transpose()?,
            term_ids,
        })
    }
}
impl TryFrom<PostRow> for Post {
    type Error = Error;
    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let terms = row
            .term_ids
            .map(|json| -> Result<Vec<u64>, Error> {
                serde_json::from_str::<Vec<i64>>(&json)
                    .or_raise(|| ErrorKind::InvalidData("post terms"))?
                    .into_iter()
                    .map(|id| from_id(id, "post term id"))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(Self {
            id: from_id(row.id, "post id")?,
            slug: row.slug,
            status: row.status,
            link: row.link,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            published_at: row.published_at.map(|t| from_timestamp(t, "post published at")).transpose()?,
            modified_at: row.modified_at.map(|t| from_timestamp(t, "post modified at")).transpose()?,
            author: row.author_id.map(|id| from_id(id, "post author")).transpose()?,
            featured_media: row.featured_media_id.map(|id| from_id(id, "post featured media")).transpose()?,
            terms,
        })
    }
}
