use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use maud::{html, Markup, DOCTYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use turboforms::{
    base_form, form_for, Failure, FormBuilder, FormOptions, ResponseOptions, Settings, Turboforms,
    TurboformsConfig, TurboformsError, Unrescued,
};

#[derive(Debug, Clone, Serialize)]
struct Post {
    id: u32,
    title: String,
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct NewPost {
    title: String,
}

/// Application state shared across handlers
#[derive(Clone, Default)]
struct AppState {
    posts: Arc<RwLock<Vec<Post>>>,
}

/// Errors that fall through to conventional page handling.
#[derive(Debug)]
enum AppError {
    Domain(Failure),
    Dispatch(TurboformsError),
}

impl From<Failure> for AppError {
    fn from(err: Failure) -> Self {
        AppError::Domain(err)
    }
}

impl From<TurboformsError> for AppError {
    fn from(err: TurboformsError) -> Self {
        AppError::Dispatch(err)
    }
}

impl From<Unrescued<Failure>> for AppError {
    fn from(err: Unrescued<Failure>) -> Self {
        match err {
            Unrescued::Propagate(err) => AppError::Domain(err),
            Unrescued::Dispatch(err) => AppError::Dispatch(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Domain(err) => {
                let status = if err.error_kind() == &turboforms::ErrorKind::RecordNotFound {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                let markup = layout("Error", html! {
                    h1 { "Something went wrong" }
                    p.error { (err.to_string()) }
                    a href="/" { "Back" }
                });
                (status, Html(markup.into_string())).into_response()
            }
            AppError::Dispatch(err) => err.into_response(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = TurboformsConfig::load_default().unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        TurboformsConfig::default()
    });
    info!(
        "turboforms-server starting (request header: {}, flash header: {})",
        config.request_header, config.flash_header
    );

    let settings = Settings::from_config(config);
    let state = AppState::default();

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/posts", post(create_handler))
        .route("/posts/:id", get(show_handler))
        .route("/posts/:id/archive", post(archive_handler))
        .with_state(state)
        .layer(settings.layer());

    let addr = std::env::var("TURBOFORMS_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
            body { (body) }
        }
    }
}

async fn index_handler(turbo: Turboforms, State(state): State<AppState>) -> Response {
    let posts = state.posts.read().await;
    let form = form_for(base_form).build(
        FormOptions::new("/posts").turboform(true),
        html! {
            input type="text" name="title" placeholder="Title";
            input type="submit" value="Create";
        },
    );

    let markup = layout("Posts", html! {
        @for (category, message) in turbo.flash_now().iter() {
            p class=(format!("flash {}", category)) { (message.as_str().unwrap_or_default()) }
        }
        h1 { "Posts" }
        ul {
            @for post in posts.iter() {
                li {
                    a href=(format!("/posts/{}", post.id)) { (post.title) }
                    @if post.archived { " (archived)" }
                }
            }
        }
        (form)
    });

    turbo.finish(Html(markup.into_string()).into_response())
}

async fn create_handler(
    mut turbo: Turboforms,
    State(state): State<AppState>,
    Form(input): Form<NewPost>,
) -> Result<Response, AppError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        let record = vec!["Title can't be blank".to_string()];
        return Ok(turbo.rescue(Failure::invalid(&record))?);
    }

    let id = {
        let mut posts = state.posts.write().await;
        let id = posts.len() as u32 + 1;
        posts.push(Post {
            id,
            title,
            archived: false,
        });
        id
    };
    info!("created post {}", id);

    Ok(turbo.redirect_to(format!("/posts/{}", id), ResponseOptions::new().notice("Post created"))?)
}

async fn show_handler(
    mut turbo: Turboforms,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Response, AppError> {
    let found = state
        .posts
        .read()
        .await
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| Failure::not_found(format!("Couldn't find Post with 'id'={}", id)));

    if turbo.is_ajax() {
        return Ok(turbo.respond(found.map(Json))?);
    }

    let post = found?;
    let markup = layout(&post.title, html! {
        @for (category, message) in turbo.flash_now().iter() {
            p class=(format!("flash {}", category)) { (message.as_str().unwrap_or_default()) }
        }
        h1 { (post.title) }
        a href="/" { "All posts" }
    });
    Ok(turbo.finish(Html(markup.into_string()).into_response()))
}

async fn archive_handler(
    mut turbo: Turboforms,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Response, AppError> {
    let archived = {
        let mut posts = state.posts.write().await;
        posts.iter_mut().find(|p| p.id == id).map(|p| {
            p.archived = true;
            p.id
        })
    };

    match archived {
        Some(_) => Ok(turbo.head_success(ResponseOptions::new().flash("success", "Post archived"))?),
        None => Ok(turbo.rescue(Failure::not_found(format!("Couldn't find Post with 'id'={}", id)))?),
    }
}
