//! Form and query payloads posted by the templates.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: String,
}

/// Target url for create and move.
#[derive(Debug, Deserialize)]
pub struct UrlForm {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewForm {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub term: String,
    /// Checkbox: present as `true` when ticked
    #[serde(default)]
    pub ignore_case: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RateForm {
    pub rating: u32,
}

#[derive(Debug, Deserialize)]
pub struct FlagForm {
    pub flagged: bool,
}

#[derive(Debug, Deserialize)]
pub struct RestoreForm {
    pub rev: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionQuery {
    pub rev: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub next: Option<String>,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserCreateForm {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}
