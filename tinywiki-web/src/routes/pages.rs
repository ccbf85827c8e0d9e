//! Page display and editing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tinywiki_core::{clean_url, Page, Processor, WikiError};
use tinywiki_render::{
    CreateTemplate, DiffEntry, EditorTemplate, HistoryTemplate, MoveTemplate, PageTemplate,
    RevisionEntry, RevisionTemplate,
};
use tracing::info;

use super::{browse, page_location};
use crate::{
    auth::{CurrentUser, MaybeUser},
    error::{blocking, render, AppError},
    forms::{EditForm, FlagForm, PreviewForm, RateForm, RestoreForm, RevisionQuery, UrlForm},
    server::AppState,
};

/// Default title for a page that does not exist yet: its last url segment.
fn title_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).replace('_', " ")
}

/// `/` shows the home page, or the index until one is written.
pub async fn home(State(state): State<AppState>, user: MaybeUser) -> Result<Response, AppError> {
    let wiki = state.wiki.clone();
    let home = state.site.site.home.clone();
    let found = blocking(move || match wiki.get(&home)? {
        Some(page) => {
            let backlinks = wiki.backlinks(&page.url)?;
            Ok(Some((page, backlinks)))
        }
        None => Ok(None),
    })
    .await?;

    match found {
        Some((page, backlinks)) => {
            let chrome = state.chrome(user.0.as_ref());
            let template = PageTemplate::new(chrome, &page).with_backlinks(&backlinks);
            Ok(render(template)?.into_response())
        }
        None => Ok(browse::index(State(state), user).await?.into_response()),
    }
}

pub async fn display(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Response, AppError> {
    let url = clean_url(&raw);
    if url.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }
    if url.chars().any(char::is_control) {
        return Err(WikiError::InvalidUrl(raw).into());
    }
    // Redirect `/Some Page` and friends to `/some_page/`.
    if raw.trim_end_matches('/') != url || !raw.ends_with('/') {
        return Ok(Redirect::to(&page_location(&url)).into_response());
    }

    let wiki = state.wiki.clone();
    let (page, backlinks) = blocking(move || {
        let page = wiki.get_or_missing(&url)?;
        let backlinks = wiki.backlinks(&url)?;
        Ok((page, backlinks))
    })
    .await?;
    let chrome = state.chrome(user.0.as_ref());
    let template = PageTemplate::new(chrome, &page).with_backlinks(&backlinks);
    Ok(render(template)?.into_response())
}

pub async fn create_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    render(CreateTemplate {
        chrome: state.chrome(Some(&user)),
        url: String::new(),
        error: None,
    })
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UrlForm>,
) -> Result<Response, AppError> {
    let url = clean_url(&form.url);
    let wiki = state.wiki.clone();
    let target = url.clone();
    let error = if url.is_empty() {
        Some("Please enter a url for the new page.".to_string())
    } else {
        blocking(move || match wiki.get_bare(&target) {
            Ok(Some(_)) => Ok(None),
            Ok(None) => Ok(Some(format!("The page \"{}\" already exists.", target))),
            Err(err @ (WikiError::InvalidUrl(_) | WikiError::OutsideRoot(_))) => {
                Ok(Some(err.to_string()))
            }
            Err(err) => Err(err),
        })
        .await?
    };

    match error {
        None => Ok(Redirect::to(&format!("/edit/{}/", url)).into_response()),
        Some(message) => {
            let page = render(CreateTemplate {
                chrome: state.chrome(Some(&user)),
                url: form.url,
                error: Some(message),
            })?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

pub async fn edit_form(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let lookup = url.clone();
    // Validate the url before offering to create it.
    let page = blocking(move || {
        wiki.path(&lookup)?;
        wiki.get(&lookup)
    })
    .await?;

    let template = match page {
        Some(page) => EditorTemplate {
            chrome: state.chrome(Some(&user)),
            title: page.title().to_string(),
            body: page.body.clone(),
            tags: page.tags().to_string(),
            url,
            is_new: false,
            error: None,
        },
        None => EditorTemplate {
            chrome: state.chrome(Some(&user)),
            title: title_from_url(&url),
            body: String::new(),
            tags: String::new(),
            url,
            is_new: true,
            error: None,
        },
    };
    render(template)
}

pub async fn edit(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<EditForm>,
) -> Result<Response, AppError> {
    let url = clean_url(&raw);
    let title = form.title.trim().to_string();
    if title.is_empty() {
        let wiki = state.wiki.clone();
        let lookup = url.clone();
        let is_new = !blocking(move || Ok(wiki.exists(&lookup))).await?;
        let page = render(EditorTemplate {
            chrome: state.chrome(Some(&user)),
            url,
            title: form.title,
            body: form.body,
            tags: form.tags,
            is_new,
            error: Some("The page needs a title.".to_string()),
        })?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let wiki = state.wiki.clone();
    let author = user.name.clone();
    let saved = blocking(move || {
        let mut page = match wiki.get(&url)? {
            Some(page) => page,
            None => Page::new(wiki.path(&url)?, url.clone()),
        };
        page.set_title(&title);
        page.set_tags(form.tags.trim());
        page.body = form.body;
        wiki.save(&mut page, &author)?;
        Ok(page.url)
    })
    .await?;

    Ok(Redirect::to(&page_location(&saved)).into_response())
}

/// Rendered HTML for the editor's preview pane.
pub async fn preview(_user: CurrentUser, Form(form): Form<PreviewForm>) -> Html<String> {
    Html(Processor::new().render_simple(&form.body))
}

pub async fn move_form(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let lookup = url.clone();
    let page = blocking(move || wiki.get_or_missing(&lookup)).await?;

    render(MoveTemplate {
        chrome: state.chrome(Some(&user)),
        title: page.title().to_string(),
        new_url: url.clone(),
        url,
        error: None,
    })
}

pub async fn move_page(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UrlForm>,
) -> Result<Response, AppError> {
    let url = clean_url(&raw);
    let new_url = clean_url(&form.url);
    if new_url == url {
        return Ok(Redirect::to(&page_location(&url)).into_response());
    }

    let wiki = state.wiki.clone();
    let (from, to) = (url.clone(), new_url.clone());
    let outcome = blocking(move || {
        if to.is_empty() {
            return Ok(Err("Please enter the new url.".to_string()));
        }
        match wiki.move_page(&from, &to) {
            Ok(()) => Ok(Ok(())),
            Err(
                err @ (WikiError::PageExists(_)
                | WikiError::InvalidUrl(_)
                | WikiError::OutsideRoot(_)),
            ) => Ok(Err(err.to_string())),
            Err(err) => Err(err),
        }
    })
    .await?;

    match outcome {
        Ok(()) => {
            info!(from = %url, to = %new_url, user = %user.name, "moved page");
            Ok(Redirect::to(&page_location(&new_url)).into_response())
        }
        Err(message) => {
            let page = render(MoveTemplate {
                chrome: state.chrome(Some(&user)),
                title: title_from_url(&url),
                url,
                new_url: form.url,
                error: Some(message),
            })?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

pub async fn delete(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Redirect, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let target = url.clone();
    let deleted = blocking(move || wiki.delete(&target)).await?;
    if !deleted {
        return Err(WikiError::PageNotFound(url).into());
    }
    info!(%url, user = %user.name, "deleted page");
    Ok(Redirect::to("/"))
}

pub async fn rate(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<RateForm>,
) -> Result<Redirect, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let page = blocking(move || wiki.rate(&url, form.rating)).await?;
    Ok(Redirect::to(&page_location(&page.url)))
}

pub async fn flag(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<FlagForm>,
) -> Result<Redirect, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let page = blocking(move || wiki.set_flagged(&url, form.flagged)).await?;
    info!(url = %page.url, flagged = form.flagged, user = %user.name, "review flag changed");
    Ok(Redirect::to(&page_location(&page.url)))
}

/// Revision list, or a single revision with its diff when `?rev=` is given.
pub async fn history(
    Path(raw): Path<String>,
    Query(query): Query<RevisionQuery>,
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Html<String>, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let lookup = url.clone();
    let (page, history) = blocking(move || {
        let page = wiki.get_or_missing(&lookup)?;
        let history = wiki.history(&lookup)?;
        Ok((page, history))
    })
    .await?;
    let chrome = state.chrome(user.0.as_ref());

    match query.rev.filter(|rev| !rev.is_empty()) {
        Some(rev) => {
            let revision = history.get(&rev)?;
            let diff = history.diff(&rev)?;
            render(RevisionTemplate {
                chrome,
                title: page.title().to_string(),
                url,
                revision: RevisionEntry::from(revision),
                body: revision.version.clone(),
                diff: diff.iter().map(DiffEntry::from).collect(),
            })
        }
        None => render(HistoryTemplate {
            chrome,
            title: page.title().to_string(),
            url,
            revisions: history.revisions().iter().map(RevisionEntry::from).collect(),
        }),
    }
}

pub async fn restore(
    Path(raw): Path<String>,
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<RestoreForm>,
) -> Result<Redirect, AppError> {
    let url = clean_url(&raw);
    let wiki = state.wiki.clone();
    let author = user.name.clone();
    let rev = form.rev.clone();
    let page = blocking(move || wiki.restore(&url, &rev, &author)).await?;
    info!(url = %page.url, rev = %form.rev, user = %user.name, "restored revision");
    Ok(Redirect::to(&page_location(&page.url)))
}
