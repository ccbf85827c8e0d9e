use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use tinywiki_core::{Config, UserManager, Wiki};
use tinywiki_render::Chrome;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    auth::{AuthState, CurrentUser, SessionKeys},
    config::ServerConfig,
    routes::{browse, pages, users},
};

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Config>,
    pub wiki: Arc<Wiki>,
    pub users: Arc<UserManager>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(site: Config, sessions: SessionKeys) -> Self {
        let wiki = Wiki::new(site.content_dir());
        let users = UserManager::new(site.users_path(), site.auth.default_authentication_method);
        Self {
            site: Arc::new(site),
            wiki: Arc::new(wiki),
            users: Arc::new(users),
            sessions: Arc::new(sessions),
        }
    }

    /// Header state for templates.
    pub fn chrome(&self, user: Option<&CurrentUser>) -> Chrome {
        Chrome {
            site_title: self.site.site.title.clone(),
            user: user.map(|u| u.name.clone()),
        }
    }
}

/// All wiki routes, with auth wired in.
pub fn build_router(state: AppState) -> Router {
    let auth_state = AuthState {
        sessions: state.sessions.clone(),
        users: state.users.clone(),
        private: state.site.auth.private,
    };

    let mut app = Router::new()
        // Public endpoints (no auth required)
        .route("/healthz", get(healthz))
        .route("/static/{*path}", get(static_asset))
        .route("/user/login/", get(users::login_form).post(users::login))
        .route("/user/logout/", get(users::logout))
        // Reading
        .route("/", get(pages::home))
        .route("/index/", get(browse::index))
        .route("/tags/", get(browse::tags))
        .route("/tag/{name}/", get(browse::tag))
        .route("/flagged/", get(browse::flagged))
        .route("/search/", get(browse::search_form).post(browse::search))
        .route("/history/{*url}", get(pages::history))
        // Editing
        .route("/create/", get(pages::create_form).post(pages::create))
        .route("/edit/{*url}", get(pages::edit_form).post(pages::edit))
        .route("/preview/", post(pages::preview))
        .route("/move/{*url}", get(pages::move_form).post(pages::move_page))
        .route("/delete/{*url}", post(pages::delete))
        .route("/rate/{*url}", post(pages::rate))
        .route("/flag/{*url}", post(pages::flag))
        .route("/restore/{*url}", post(pages::restore))
        // Accounts
        .route("/user/", get(users::list))
        .route("/user/create/", get(users::create_form).post(users::create))
        .route("/user/delete/{name}/", post(users::delete))
        .route("/user/{name}/", get(users::profile))
        // Everything else is a page url
        .route("/{*url}", get(pages::display));

    if let Some(dir) = state.site.static_dir() {
        app = app.nest_service("/assets", ServeDir::new(dir));
    }

    app.layer(Extension(auth_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let sessions = config.session_keys();
    let state = AppState::new(config.site.clone(), sessions);

    std::fs::create_dir_all(state.wiki.root())?;
    info!(
        content = %state.wiki.root().display(),
        users = %state.users.path().display(),
        "serving wiki"
    );

    let app = build_router(state);

    info!(addr = %config.listen_addr, "tinywiki listening");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn static_asset(Path(path): Path<String>) -> impl IntoResponse {
    match tinywiki_render::asset(&path) {
        Some((bytes, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
