//! Dashboard pages
//!
//! `GET /` lists stored species in a selector; the selected species (query
//! `name`, defaulting to the first entry) is shown as its image beside its
//! record table. `GET /species/:key` shows one species directly.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use species_common::ui::{encode_path_segment, escape_html, notice, page, record_table, NoticeKind};
use species_common::{FolderKey, Listing, StoredEntry, StoredRecord};

use crate::api::species::{BrowseError, NO_DATA_WARNING, NO_SPECIES_WARNING};
use crate::AppState;

const TITLE: &str = "Dashboard - Animal Details";
const SUBTITLE: &str = "Browse previously analyzed species.";
const MODULE: &str = "species-dashboard";

/// Query parameters for the dashboard page
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Folder key of the species to show
    pub name: Option<String>,
}

/// GET /
pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let selected = query.name.filter(|n| !n.is_empty());
    render(&state, selected.as_deref()).await
}

/// GET /species/:key
pub async fn species_page(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    render(&state, Some(&key)).await
}

async fn render(state: &AppState, requested: Option<&str>) -> Response {
    let listing = match state.store.browse().await {
        Ok(listing) => listing,
        Err(e) => return error_page(state, BrowseError::from(e)),
    };

    let keys = match &listing {
        Listing::MissingRoot => {
            return Html(render_page(state, &notice(NoticeKind::Warning, NO_DATA_WARNING)))
                .into_response()
        }
        Listing::Empty => {
            return Html(render_page(
                state,
                &notice(NoticeKind::Warning, NO_SPECIES_WARNING),
            ))
            .into_response()
        }
        Listing::Entries(keys) => keys,
    };

    let selected = match requested {
        Some(raw) => FolderKey::parse(raw),
        None => Ok(keys[0].clone()),
    };
    let loaded = match selected {
        Ok(key) => state.store.load(&key).await,
        Err(e) => Err(e),
    };

    // The selector stays on the page whatever happened to the selection
    match loaded {
        Ok(entry) => {
            let body = format!(
                "{}\n{}",
                selector(keys, Some(&entry.key)),
                entry_view(&entry)
            );
            Html(render_page(state, &body)).into_response()
        }
        Err(e) => {
            let error = BrowseError::from(e);
            let body = format!(
                "{}\n{}",
                selector(keys, None),
                notice(NoticeKind::Error, &error.message())
            );
            (error.status(), Html(render_page(state, &body))).into_response()
        }
    }
}

fn nav(state: &AppState) -> String {
    format!(
        r#"<a href="{}">Analyze</a><a href="/">Dashboard</a>"#,
        escape_html(&state.analyzer_url)
    )
}

fn render_page(state: &AppState, body: &str) -> String {
    page(TITLE, SUBTITLE, MODULE, &nav(state), body)
}

fn error_page(state: &AppState, error: BrowseError) -> Response {
    let status = error.status();
    let body = notice(NoticeKind::Error, &error.message());
    (status, Html(render_page(state, &body))).into_response()
}

/// Selector populated from folder names
fn selector(keys: &[FolderKey], selected: Option<&FolderKey>) -> String {
    let options: String = keys
        .iter()
        .map(|key| {
            format!(
                "<option value=\"{}\"{}>{}</option>\n",
                escape_html(key.as_str()),
                if Some(key) == selected { " selected" } else { "" },
                escape_html(key.as_str())
            )
        })
        .collect();

    format!(
        r#"<form method="get" action="/">
    <label for="name">Select an animal by common name</label><br>
    <select id="name" name="name" onchange="this.form.submit()">
{options}    </select>
    <noscript><button type="submit">Show</button></noscript>
</form>"#,
        options = options
    )
}

/// Image beside record table; each side only when its file exists, and an
/// unreadable record becomes a notice in place of the table
fn entry_view(entry: &StoredEntry) -> String {
    let encoded = encode_path_segment(entry.key.as_str());

    let image = if entry.image_path.is_some() {
        format!(
            r#"<img class="species" src="/species/{}/image" alt="{caption}">
        <p class="caption">{caption}</p>"#,
            encoded,
            caption = escape_html(&entry.key.display_name())
        )
    } else {
        String::new()
    };

    let details = match &entry.record {
        StoredRecord::Valid(record) => format!(
            r#"{}
        <a class="button" href="/api/species/{}/download">Download Data as JSON</a>"#,
            record_table(record),
            encoded
        ),
        StoredRecord::Malformed(e) => notice(
            NoticeKind::Error,
            &format!("The stored record for {} could not be read: {}", entry.key, e),
        ),
        StoredRecord::Missing => String::new(),
    };

    format!(
        r#"<div class="columns">
    <div>
        {image}
    </div>
    <div>
        {details}
    </div>
</div>"#,
        image = image,
        details = details
    )
}
