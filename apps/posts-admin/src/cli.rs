//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use posts_core::domain::{PostStatus, User};

#[derive(Debug, Parser)]
#[command(name = "posts-admin")]
#[command(about = "Manage the file-backed post store", long_about = None)]
pub struct Cli {
    /// Data directory (overrides POSTS_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the directory layout and seed a sample post into an empty store
    Init {
        /// Author of the sample post
        #[arg(long, default_value = "system")]
        seed_as: String,
    },
    /// Create a post
    Create {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// draft or published
        #[arg(long, default_value = "draft")]
        status: String,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Print a post
    Show { id: Uuid },
    /// Change fields of a post
    Update {
        id: Uuid,
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Replace the tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Remove every tag
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },
    /// Delete a post
    Delete {
        id: Uuid,
        #[command(flatten)]
        actor: Actor,
    },
    /// List posts, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        status: Option<PostStatus>,
        #[arg(long)]
        author: Option<String>,
        /// Required tag (repeatable, all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Case-insensitive text to look for in title, author and tags
        #[arg(long)]
        search: Option<String>,
    },
    /// Rebuild the post index from the post directories
    Reindex,
}

/// The user a mutation is performed as.
#[derive(Debug, Clone, Args)]
pub struct Actor {
    /// Login of the acting user
    #[arg(long = "as", value_name = "LOGIN")]
    pub login: String,
    /// Numeric id of the acting user, recorded in the activity log
    #[arg(long, default_value_t = 0)]
    pub user_id: u64,
}

impl Actor {
    pub fn user(&self) -> User {
        User::new(self.user_id, self.login.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("posts-admin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn create_collects_repeated_tags() {
        let cli = parse(&[
            "create", "--as", "alice", "--title", "T", "--content", "C", "--tag", "a", "--tag", "b",
        ]);

        let Command::Create {
            actor,
            status,
            tags,
            ..
        } = cli.command
        else {
            panic!("expected create");
        };
        assert_eq!(actor.user(), User::new(0, "alice"));
        assert_eq!(status, "draft");
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn data_dir_is_accepted_after_the_subcommand() {
        let cli = parse(&["list", "--status", "published", "--data-dir", "/tmp/posts"]);

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/posts")));
        let Command::List {
            page,
            limit,
            status,
            ..
        } = cli.command
        else {
            panic!("expected list");
        };
        assert_eq!((page, limit), (1, 10));
        assert_eq!(status, Some(PostStatus::Published));
    }

    #[test]
    fn clear_tags_conflicts_with_tag() {
        let id = Uuid::new_v4().to_string();
        let cli = parse(&["update", id.as_str(), "--as", "alice", "--clear-tags"]);
        assert!(matches!(cli.command, Command::Update { clear_tags: true, .. }));

        let both = Cli::try_parse_from([
            "posts-admin",
            "update",
            id.as_str(),
            "--as",
            "alice",
            "--clear-tags",
            "--tag",
            "x",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn rejects_malformed_ids_and_missing_actor() {
        let bad_id = Cli::try_parse_from(["posts-admin", "show", "not-a-uuid"]);
        assert!(bad_id.is_err());

        let id = Uuid::new_v4().to_string();
        let no_actor = Cli::try_parse_from(["posts-admin", "delete", id.as_str()]);
        assert!(no_actor.is_err());
    }
}
