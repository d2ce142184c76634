use std::fmt::{Display, Formatter, Result as FmtResult};

/// A user who authored posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    /// Remote identifier (primary key)
    pub id: u64,
    /// Display name
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Profile URL
    pub link: Option<String>,
    pub avatar_url: Option<String>,
}
impl Author {
    pub fn new(id: u64) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.name, &self.slug) {
            (Some(name), _) => write!(f, "{name}"),
            (None, Some(slug)) => write!(f, "{slug}"),
            (None, None) => write!(f, "#{}", self.id),
        }
    }
}
