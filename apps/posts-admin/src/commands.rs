//! Command handlers.
//!
//! Each handler returns the JSON document printed on success.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use posts_core::domain::{ListQuery, NewPost, Post, PostPatch, PostStatus, User};
use posts_core::ports::PostRepository;
use posts_shared::{ApiResponse, CreatePostRequest, UpdatePostRequest};

use crate::cli::Command;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const SAMPLE_TITLE: &str = "Getting Started with Mathematics";
const SAMPLE_CONTENT: &str = "A comprehensive guide to basic mathematical concepts including \
algebra, geometry, and trigonometry. This resource is perfect for students looking to build a \
strong foundation in mathematics.";
const SAMPLE_TAGS: [&str; 3] = ["mathematics", "beginner", "tutorial"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitOutcome {
    data_dir: String,
    seeded: Option<Post>,
}

pub async fn run(state: &AppState, command: Command) -> AppResult<Value> {
    match command {
        Command::Init { seed_as } => init(state, seed_as).await,
        Command::Create {
            actor,
            title,
            content,
            status,
            tags,
        } => {
            let request = CreatePostRequest {
                title,
                content,
                author: actor.login.clone(),
                status,
                tags: (!tags.is_empty()).then_some(tags),
            };
            create(state, request, &actor.user()).await
        }
        Command::Show { id } => show(state, id).await,
        Command::Update {
            id,
            actor,
            title,
            content,
            status,
            author,
            tags,
            clear_tags,
        } => {
            let tags = if clear_tags {
                Some(Vec::new())
            } else {
                (!tags.is_empty()).then_some(tags)
            };
            let request = UpdatePostRequest {
                title,
                content,
                author,
                status,
                tags,
            };
            update(state, id, request, &actor.user()).await
        }
        Command::Delete { id, actor } => delete(state, id, &actor.user()).await,
        Command::List {
            page,
            limit,
            status,
            author,
            tags,
            search,
        } => {
            let query = ListQuery {
                page,
                limit,
                status,
                author,
                tags,
                search,
            };
            list(state, &query).await
        }
        Command::Reindex => reindex(state).await,
    }
}

async fn init(state: &AppState, seed_as: String) -> AppResult<Value> {
    let store = &state.store;
    store.ensure_layout().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create data directories");
        AppError::Internal("Failed to create data directories".to_string())
    })?;

    let existing = store
        .list(&ListQuery {
            limit: 1,
            ..Default::default()
        })
        .await?;

    let seeded = if existing.total == 0 {
        tracing::info!(author = %seed_as, "No posts found, creating sample post");
        let system = User::new(0, seed_as.clone());
        let sample = NewPost {
            title: SAMPLE_TITLE.to_string(),
            content: SAMPLE_CONTENT.to_string(),
            author: seed_as,
            status: PostStatus::Published,
            tags: Some(SAMPLE_TAGS.iter().map(|t| t.to_string()).collect()),
        };
        Some(store.create(sample, Some(&system)).await?)
    } else {
        tracing::info!(posts = existing.total, "Existing posts found, skipping sample data");
        None
    };

    respond(ApiResponse::ok_with_message(
        InitOutcome {
            data_dir: store.config().data_dir.display().to_string(),
            seeded,
        },
        "Post store initialized",
    ))
}

async fn create(state: &AppState, request: CreatePostRequest, user: &User) -> AppResult<Value> {
    let new_post = NewPost {
        title: request.title,
        content: request.content,
        author: request.author,
        status: parse_status(&request.status)?,
        tags: request.tags,
    };

    let post = state.store.create(new_post, Some(user)).await?;
    let message = format!("Created post {}", post.id);
    respond(ApiResponse::ok_with_message(post, message))
}

async fn show(state: &AppState, id: Uuid) -> AppResult<Value> {
    match state.store.get(id).await? {
        Some(post) => respond(ApiResponse::ok(post)),
        None => Err(not_found(id)),
    }
}

async fn update(
    state: &AppState,
    id: Uuid,
    request: UpdatePostRequest,
    user: &User,
) -> AppResult<Value> {
    if request.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let patch = PostPatch {
        title: request.title,
        content: request.content,
        author: request.author,
        status: request.status.as_deref().map(parse_status).transpose()?,
        tags: request.tags,
    };

    match state.store.update(id, patch, Some(user)).await? {
        Some(post) => respond(ApiResponse::ok_with_message(post, format!("Updated post {id}"))),
        None => Err(not_found(id)),
    }
}

async fn delete(state: &AppState, id: Uuid, user: &User) -> AppResult<Value> {
    if state.store.delete(id, Some(user)).await? {
        respond(ApiResponse::ok_with_message(id, format!("Deleted post {id}")))
    } else {
        Err(not_found(id))
    }
}

async fn list(state: &AppState, query: &ListQuery) -> AppResult<Value> {
    let page = state.store.list(query).await?;
    respond(ApiResponse::ok(page))
}

async fn reindex(state: &AppState) -> AppResult<Value> {
    let report = state.store.rebuild_index().await?;
    respond(ApiResponse::ok_with_message(report, "Post index rebuilt"))
}

fn parse_status(raw: &str) -> AppResult<PostStatus> {
    raw.parse().map_err(AppError::BadRequest)
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}

fn respond<T: Serialize>(response: ApiResponse<T>) -> AppResult<Value> {
    serde_json::to_value(response).map_err(|e| AppError::Internal(e.to_string()))
}
