//! Client-side filtering and ordering of the post list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PostSummary;

/// Ordering policies offered by the post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "oldest")]
    Oldest,
    #[serde(rename = "upvotes-desc")]
    MostLiked,
    #[serde(rename = "upvotes-asc")]
    LeastLiked,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::MostLiked,
        SortOrder::LeastLiked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::MostLiked => "upvotes-desc",
            SortOrder::LeastLiked => "upvotes-asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Newest => "Newest (creation time)",
            SortOrder::Oldest => "Oldest (creation time)",
            SortOrder::MostLiked => "Most upvotes",
            SortOrder::LeastLiked => "Fewest upvotes",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| format!("unknown sort order: {s}"))
    }
}

/// Keep posts whose title contains `term` (case-insensitive), then order
/// them by `order`.
///
/// The sort is stable: posts that compare equal keep their fetch order.
pub fn filter_and_sort(
    posts: impl IntoIterator<Item = PostSummary>,
    term: &str,
    order: SortOrder,
) -> Vec<PostSummary> {
    let term = term.to_lowercase();
    let mut posts: Vec<PostSummary> = posts
        .into_iter()
        .filter(|post| post.title.to_lowercase().contains(&term))
        .collect();

    match order {
        SortOrder::Newest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::MostLiked => posts.sort_by(|a, b| b.likes().cmp(&a.likes())),
        SortOrder::LeastLiked => posts.sort_by(|a, b| a.likes().cmp(&b.likes())),
    }

    posts
}
