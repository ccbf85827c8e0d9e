//! Listings: index, tags, flagged pages and search.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use tinywiki_core::{WikiError, DEFAULT_SEARCH_ATTRS};
use tinywiki_render::{IndexTemplate, PageEntry, SearchTemplate, TagEntry, TagsTemplate};

use crate::{
    auth::MaybeUser,
    error::{blocking, render, AppError},
    forms::SearchForm,
    server::AppState,
};

pub async fn index(
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Html<String>, AppError> {
    let wiki = state.wiki.clone();
    let pages = blocking(move || wiki.index()).await?;

    render(IndexTemplate {
        chrome: state.chrome(user.0.as_ref()),
        heading: "All pages".to_string(),
        empty_message: "No pages yet. Create the first one!".to_string(),
        pages: pages.iter().map(PageEntry::from).collect(),
    })
}

pub async fn tags(
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Html<String>, AppError> {
    let wiki = state.wiki.clone();
    let tags = blocking(move || wiki.get_tags()).await?;

    render(TagsTemplate {
        chrome: state.chrome(user.0.as_ref()),
        tags: tags
            .iter()
            .map(|(name, pages)| TagEntry {
                name: name.clone(),
                count: pages.len(),
            })
            .collect(),
    })
}

pub async fn tag(
    Path(name): Path<String>,
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Html<String>, AppError> {
    let wiki = state.wiki.clone();
    let lookup = name.clone();
    let pages = blocking(move || wiki.index_by_tag(&lookup)).await?;

    render(IndexTemplate {
        chrome: state.chrome(user.0.as_ref()),
        heading: format!("Tag: {}", name),
        empty_message: "No pages carry this tag.".to_string(),
        pages: pages.iter().map(PageEntry::from).collect(),
    })
}

pub async fn flagged(
    State(state): State<AppState>,
    user: MaybeUser,
) -> Result<Html<String>, AppError> {
    let wiki = state.wiki.clone();
    let pages = blocking(move || wiki.flagged()).await?;

    render(IndexTemplate {
        chrome: state.chrome(user.0.as_ref()),
        heading: "Flagged for review".to_string(),
        empty_message: "No pages are flagged.".to_string(),
        pages: pages.iter().map(PageEntry::from).collect(),
    })
}

/// Empty form, or results when `term` is given in the query string.
///
/// Links like `/search/?term=x` carry no checkbox, so case is ignored
/// unless `ignore_case=false` is given.
pub async fn search_form(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<SearchForm>,
) -> Result<Response, AppError> {
    let ignore_case = query.ignore_case.unwrap_or(true);
    if query.term.trim().is_empty() {
        return Ok(render(SearchTemplate {
            chrome: state.chrome(user.0.as_ref()),
            term: String::new(),
            ignore_case,
            results: None,
            error: None,
        })?
        .into_response());
    }
    run_search(state, user, query.term, ignore_case).await
}

/// Submitted form; an unticked checkbox is absent and means case-sensitive.
pub async fn search(
    State(state): State<AppState>,
    user: MaybeUser,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let ignore_case = form.ignore_case.unwrap_or(false);
    run_search(state, user, form.term, ignore_case).await
}

async fn run_search(
    state: AppState,
    user: MaybeUser,
    term: String,
    ignore_case: bool,
) -> Result<Response, AppError> {
    let wiki = state.wiki.clone();
    let pattern = term.clone();
    let outcome = blocking(move || {
        match wiki.search(&pattern, ignore_case, &DEFAULT_SEARCH_ATTRS) {
            Ok(pages) => Ok(Ok(pages)),
            Err(err @ WikiError::InvalidSearch(_)) => Ok(Err(err.to_string())),
            Err(err) => Err(err),
        }
    })
    .await?;

    let chrome = state.chrome(user.0.as_ref());
    match outcome {
        Ok(pages) => Ok(render(SearchTemplate {
            chrome,
            term,
            ignore_case,
            results: Some(pages.iter().map(PageEntry::from).collect()),
            error: None,
        })?
        .into_response()),
        Err(message) => {
            let page = render(SearchTemplate {
                chrome,
                term,
                ignore_case,
                results: None,
                error: Some(message),
            })?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}
