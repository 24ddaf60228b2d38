//! UI pages - upload form and result presenter
//!
//! Server-rendered HTML; the only script disables the submit button and
//! shows the in-progress indicator while the classification request runs.

use axum::{
    extract::State,
    response::Html,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use species_common::ui::{escape_html, notice, page, record_table, NoticeKind};
use species_common::SpeciesRecord;

use crate::services::intake::ACCEPTED_EXTENSIONS;
use crate::services::Analysis;
use crate::AppState;

const TITLE: &str = "Animal Image Analyzer";
const SUBTITLE: &str = "Upload an animal image to extract species information.";
const MODULE: &str = "species-analyzer";

/// File name offered for the JSON download
pub const DOWNLOAD_FILE_NAME: &str = "species_data.json";

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(upload_page))
}

/// GET /
///
/// Upload form
pub async fn upload_page(State(state): State<AppState>) -> Html<String> {
    Html(render_upload_page(&state, None))
}

fn nav(state: &AppState) -> String {
    format!(
        r#"<a href="/">Analyze</a><a href="{}">Dashboard</a>"#,
        escape_html(&state.dashboard_url)
    )
}

fn upload_form() -> String {
    let accept: Vec<String> = ACCEPTED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();

    format!(
        r#"<form id="upload-form" action="/analyze" method="post" enctype="multipart/form-data">
    <label for="image">Choose an image</label><br>
    <input type="file" id="image" name="image" accept="{accept}">
    <br>
    <button type="submit" id="submit-button">Submit</button>
    <span id="progress" hidden>Analyzing the image...</span>
</form>
<script>
    document.getElementById('upload-form').addEventListener('submit', function () {{
        document.getElementById('submit-button').disabled = true;
        document.getElementById('progress').hidden = false;
    }});
</script>"#,
        accept = accept.join(",")
    )
}

/// Upload form, optionally preceded by a rendered notice
pub fn render_upload_page(state: &AppState, notice_html: Option<String>) -> String {
    let body = format!(
        "{}\n{}",
        notice_html.unwrap_or_default(),
        upload_form()
    );
    page(TITLE, SUBTITLE, MODULE, &nav(state), &body)
}

/// `data:` URL carrying the record as compact JSON
pub fn download_href(record: &SpeciesRecord) -> serde_json::Result<String> {
    let json = serde_json::to_string(record)?;
    Ok(format!("data:application/json;base64,{}", STANDARD.encode(json)))
}

/// Result presenter: uploaded image, field/value table and JSON download
pub fn render_result_page(state: &AppState, analysis: &Analysis) -> String {
    let download = match download_href(&analysis.record) {
        Ok(href) => format!(
            r#"<a class="button" href="{}" download="{}" type="application/json">Download Data as JSON</a>"#,
            href, DOWNLOAD_FILE_NAME
        ),
        Err(e) => notice(
            NoticeKind::Warning,
            &format!("JSON download unavailable: {}", e),
        ),
    };

    let body = format!(
        r#"{form}
<div class="columns">
    <div>
        <img class="species" src="{image_src}" alt="Uploaded Image">
        <p class="caption">Uploaded Image</p>
    </div>
    <div>
        {saved}
        {replaced}
        {extracted}
        {table}
        {download}
    </div>
</div>"#,
        form = upload_form(),
        image_src = analysis.image.data_url(),
        saved = notice(
            NoticeKind::Success,
            &format!("Data saved in folder: {}", analysis.stored.folder.display())
        ),
        replaced = if analysis.stored.replaced {
            notice(
                NoticeKind::Warning,
                &format!("Replaced the earlier record stored as {}", analysis.stored.key),
            )
        } else {
            String::new()
        },
        extracted = notice(
            NoticeKind::Success,
            "Species information extracted successfully!"
        ),
        table = record_table(&analysis.record),
        download = download,
    );

    page(TITLE, SUBTITLE, MODULE, &nav(state), &body)
}
