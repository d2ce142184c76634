use derive_more::{Display, Error};
use std::fmt::{Formatter, Result as FmtResult};
use std::str::FromStr;

/// A taxonomy entry that posts can be filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Remote identifier (primary key, unique across taxonomies)
    pub id: u64,
    /// Which taxonomy this term belongs to
    pub kind: TermKind,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Parent term identifier (hierarchical taxonomies only)
    pub parent: Option<u64>,
    /// Number of published posts using this term, as reported by the server
    pub post_count: Option<u64>,
}
impl Term {
    pub fn new(id: u64, kind: TermKind) -> Self {
        Self {
            id,
            kind,
            name: None,
            slug: None,
            description: None,
            parent: None,
            post_count: None,
        }
    }

    pub fn category(id: u64, name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::new(id, TermKind::Category) }
    }

    pub fn tag(id: u64, name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::new(id, TermKind::Tag) }
    }
}

/// Taxonomy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Hierarchical grouping
    Category,
    /// Flat, free-form label
    Tag,
}
impl TermKind {
    /// Returns the taxonomy name as used by the sync API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Tag => "post_tag",
        }
    }
}
impl std::fmt::Display for TermKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a taxonomy name is not one we cache.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("unknown taxonomy: {_0}")]
pub struct UnknownTaxonomy(#[error(not(source))] pub String);

impl FromStr for TermKind {
    type Err = UnknownTaxonomy;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(TermKind::Category),
            "post_tag" | "tag" => Ok(TermKind::Tag),
            other => Err(UnknownTaxonomy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("category", TermKind::Category)]
    #[case("post_tag", TermKind::Tag)]
    #[case("tag", TermKind::Tag)]
    fn test_parse_taxonomy(#[case] input: &str, #[case] expected: TermKind) {
        assert_eq!(input.parse::<TermKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_taxonomy() {
        assert_eq!("nav_menu".parse::<TermKind>(), Err(UnknownTaxonomy("nav_menu".to_string())));
    }

    #[test]
    fn test_taxonomy_survives_display() {
        for kind in [TermKind::Category, TermKind::Tag] {
            assert_eq!(kind.to_string().parse::<TermKind>().unwrap(), kind);
        }
    }
}
