use serde::{Deserialize, Serialize};

use super::post::{Post, PostMetadata, PostStatus};

/// Filter and pagination options for listing posts.
///
/// All present filters must hold for a post to be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    /// 1-based page number. 0 is read as 1.
    pub page: u32,
    pub limit: u32,
    pub status: Option<PostStatus>,
    pub author: Option<String>,
    /// Every tag listed here must be present on the post.
    pub tags: Vec<String>,
    /// Case-insensitive substring matched against title, author and tags.
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            author: None,
            tags: Vec::new(),
            search: None,
        }
    }
}

impl ListQuery {
    pub fn matches(&self, metadata: &PostMetadata) -> bool {
        if let Some(status) = self.status {
            if metadata.status != status {
                return false;
            }
        }

        if let Some(author) = non_empty(&self.author) {
            if metadata.author != author {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let Some(tags) = &metadata.tags else {
                return false;
            };
            if !self.tags.iter().all(|wanted| tags.contains(wanted)) {
                return false;
            }
        }

        if let Some(search) = non_empty(&self.search) {
            let needle = search.to_lowercase();
            let hit = metadata.title.to_lowercase().contains(&needle)
                || metadata.author.to_lowercase().contains(&needle)
                || metadata
                    .tags
                    .iter()
                    .flatten()
                    .any(|tag| tag.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        true
    }

    pub fn skip(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit as usize
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.skip() + (self.limit as usize) < total
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// One page of listed posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: usize,
    pub has_more: bool,
}
