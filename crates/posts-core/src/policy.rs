//! Authorization rules for post mutations.
//!
//! Creating a post requires acting as its author. Modifying or deleting one
//! requires being its author or being flagged as staff in the user roster.
//! The roster lookup itself is the caller's job; these functions only decide.

use crate::domain::{NewPost, Post, User};
use crate::error::PostError;

/// The kind of mutation being authorized, used to phrase denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Modify,
    Delete,
}

impl Mutation {
    fn verb(&self) -> &'static str {
        match self {
            Mutation::Modify => "modify",
            Mutation::Delete => "delete",
        }
    }
}

/// Check that `user` may create `post`.
pub fn authorize_create<'a>(user: Option<&'a User>, post: &NewPost) -> Result<&'a User, PostError> {
    let user =
        user.ok_or_else(|| PostError::unauthorized("Authentication required to create posts"))?;

    if post.author != user.login {
        return Err(PostError::unauthorized("You can only create posts as yourself"));
    }

    Ok(user)
}

/// Whether a roster lookup is needed before calling [`authorize_mutation`].
///
/// Authors can always touch their own posts, so the roster is only consulted
/// for everyone else.
pub fn needs_staff_check(user: Option<&User>, post: &Post) -> bool {
    user.is_some_and(|u| u.login != post.author)
}

/// Check that `user` may apply `mutation` to `post`.
pub fn authorize_mutation<'a>(
    user: Option<&'a User>,
    is_staff: bool,
    post: &Post,
    mutation: Mutation,
) -> Result<&'a User, PostError> {
    let denied = || {
        PostError::unauthorized(format!(
            "You do not have permission to {} this post",
            mutation.verb()
        ))
    };

    let user = user.ok_or_else(denied)?;
    if is_staff || post.author == user.login {
        Ok(user)
    } else {
        Err(denied())
    }
}
