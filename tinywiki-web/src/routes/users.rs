//! Login, logout and account management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use tinywiki_core::{is_valid_user_name, WikiError, ADMIN_ROLE};
use tinywiki_render::{LoginTemplate, UserCreateTemplate, UserEntry, UserTemplate, UsersTemplate};
use tracing::{info, warn};

use crate::{
    auth::{safe_next, CurrentUser, SessionKeys},
    error::{blocking, render, AppError},
    forms::{LoginForm, NextQuery, UserCreateForm},
    server::AppState,
};

pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, AppError> {
    render(LoginTemplate {
        chrome: state.chrome(None),
        next: safe_next(query.next.as_deref()),
        name: String::new(),
        error: None,
    })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let users = state.users.clone();
    let (name, password) = (form.name.trim().to_string(), form.password);
    let lookup = name.clone();
    let user = blocking(move || users.authenticate(&lookup, &password)).await?;
    let next = safe_next(form.next.as_deref());

    match user {
        Some(user) => {
            let token = state.sessions.issue(&user.name)?;
            info!(user = %user.name, "logged in");
            Ok((jar.add(SessionKeys::cookie(token)), Redirect::to(&next)).into_response())
        }
        None => {
            warn!(user = %name, "failed login");
            let page = render(LoginTemplate {
                chrome: state.chrome(None),
                next,
                name,
                error: Some("Invalid name or password.".to_string()),
            })?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(SessionKeys::removal()), Redirect::to("/"))
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let users = state.users.clone();
    let all = blocking(move || users.list()).await?;

    render(UsersTemplate {
        chrome: state.chrome(Some(&user)),
        users: all.iter().map(UserEntry::from).collect(),
        can_admin: user.admin,
    })
}

pub async fn profile(
    Path(name): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let users = state.users.clone();
    let lookup = name.clone();
    let profile = blocking(move || users.get_user(&lookup))
        .await?
        .ok_or(WikiError::UserNotFound(name))?;

    render(UserTemplate {
        chrome: state.chrome(Some(&user)),
        profile: UserEntry::from(&profile),
        can_admin: user.admin,
    })
}

pub async fn create_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    user.require_admin()?;
    render(UserCreateTemplate {
        chrome: state.chrome(Some(&user)),
        name: String::new(),
        error: None,
    })
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UserCreateForm>,
) -> Result<Response, AppError> {
    user.require_admin()?;

    let name = form.name.trim().to_string();
    let error = if !is_valid_user_name(&name) {
        Some("Names must be non-empty and may not contain '/' or control characters.".to_string())
    } else if form.password.is_empty() {
        Some("Please choose a password.".to_string())
    } else {
        let users = state.users.clone();
        let new_name = name.clone();
        let roles = if form.admin {
            vec![ADMIN_ROLE.to_string()]
        } else {
            Vec::new()
        };
        blocking(move || {
            match users.add_user(&new_name, &form.password, true, roles, None) {
                Ok(_) => Ok(None),
                Err(err @ WikiError::UserExists(_)) => Ok(Some(err.to_string())),
                Err(err) => Err(err),
            }
        })
        .await?
    };

    match error {
        None => {
            info!(created = %name, by = %user.name, "user created");
            Ok(Redirect::to(&format!("/user/{}/", name)).into_response())
        }
        Some(message) => {
            let page = render(UserCreateTemplate {
                chrome: state.chrome(Some(&user)),
                name,
                error: Some(message),
            })?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

pub async fn delete(
    Path(name): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Redirect, AppError> {
    user.require_admin()?;

    let users = state.users.clone();
    let target = name.clone();
    if !blocking(move || users.delete_user(&target)).await? {
        return Err(WikiError::UserNotFound(name).into());
    }
    info!(deleted = %name, by = %user.name, "user deleted");
    Ok(Redirect::to("/user/"))
}
