use crate::error::{Error, ErrorKind};
use crate::models::{from_id, to_id};
use exn::ResultExt;
use feedstash_models::{Term, TermKind};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TermRow {
    pub(crate) id: i64,
    pub(crate) taxonomy: String,
    pub(crate) name: Option<String>,
    pub(crate) slug: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) parent_id: Option<i64>,
    pub(crate) post_count: Option<i64>,
}
impl TryFrom<&Term> for TermRow {
    type Error = Error;
    fn try_from(term: &Term) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_id(term.id, "term id")?,
            taxonomy: term.kind.as_str().to_string(),
            name: term.name.clone(),
            slug: term.slug.clone(),
            description: term.description.clone(),
            parent_id: term.parent.map(|id| to_id(id, "term parent")).transpose()?,
            post_count: term.post_count.map(|n| to_id(n, "term post count")).transpose()?,
        })
    }
}
impl TryFrom<TermRow> for Term {
    type Error = Error;
    fn try_from(row: TermRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_id(row.id, "term id")?,
            kind: row.taxonomy.parse::<TermKind>().or_raise(|| ErrorKind::InvalidData("term taxonomy"))?,
            name: row.name,
            slug: row.slug,
            description: row.description,
            parent: row.parent_id.map(|id| from_id(id, "term parent")).transpose()?,
            post_count: row.post_count.map(|n| from_id(n, "term post count")).transpose()?,
        })
    }
}
