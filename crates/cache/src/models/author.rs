use crate::error::Error;
use crate::models::{from_id, to_id};
use feedstash_models::Author;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AuthorRow {
    pub(crate) id: i64,
    pub(crate) name: Option<String>,
    pub(crate) slug: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) link: Option<String>,
    pub(crate) avatar_url: Option<String>,
}
impl TryFrom<&Author> for AuthorRow {
    type Error = Error;
    fn try_from(author: &Author) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_id(author.id, "author id")?,
            name: author.name.clone(),
            slug: author.slug.clone(),
            description: author.description.clone(),
            link: author.link.clone(),
            avatar_url: author.avatar_url.clone(),
        })
    }
}
impl TryFrom<AuthorRow> for Author {
    type Error = Error;
    fn try_from(row: AuthorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_id(row.id, "author id")?,
            name: row.name,
            slug: row.slug,
            description: row.description,
            link: row.link,
            avatar_url: row.avatar_url,
        })
    }
}
