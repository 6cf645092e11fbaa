//! Handlers for the interactive page: view, upload, query, clear.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    Form,
};
use serde::Deserialize;

use crate::documents::UploadedFile;
use crate::errors::AppError;
use crate::state::AppState;
use crate::ui::{render_page, PageView};

/// Multipart field carrying the PDFs.
pub const UPLOAD_FIELD: &str = "files";

type PageResponse = (StatusCode, Html<String>);

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub q: String,
}

/// GET /
pub async fn handle_index(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    Html(render_page(&session.status(), &PageView::default()))
}

/// POST /upload
///
/// Indexes every PDF in the `files` field and renders the per-file report.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<PageResponse, AppError> {
    let files = read_uploads(multipart).await?;

    let mut session = state.session.lock().await;
    let page = match session.handle_upload(files).await {
        Ok(report) => {
            let view = PageView {
                upload: Some(&report),
                ..Default::default()
            };
            (StatusCode::OK, Html(render_page(&session.status(), &view)))
        }
        Err(e) => {
            e.log();
            let message = e.user_message(state.expose_error_detail);
            let view = PageView {
                error: Some(&message),
                ..Default::default()
            };
            (e.status_code(), Html(render_page(&session.status(), &view)))
        }
    };
    Ok(page)
}

/// POST /query
///
/// Retrieves matching chunks and renders the model's summary, or the error
/// in place of it. Either way the page keeps its forms, so the next query
/// can be submitted straight away.
pub async fn handle_query(
    State(state): State<AppState>,
    Form(form): Form<QueryForm>,
) -> PageResponse {
    let mut session = state.session.lock().await;
    match session.handle_query(&form.q).await {
        Ok(outcome) => {
            let view = PageView {
                query: Some(&outcome.query),
                answer: Some(&outcome.answer.text),
                results: &outcome.results,
                ..Default::default()
            };
            (StatusCode::OK, Html(render_page(&session.status(), &view)))
        }
        Err(e) => {
            e.log();
            let message = e.user_message(state.expose_error_detail);
            let view = PageView {
                query: Some(&form.q),
                error: Some(&message),
                ..Default::default()
            };
            (e.status_code(), Html(render_page(&session.status(), &view)))
        }
    }
}

/// POST /clear
pub async fn handle_clear(State(state): State<AppState>) -> PageResponse {
    let mut session = state.session.lock().await;
    match session.clear_store() {
        Ok(removed) => {
            let notice = format!("Cleared {removed} indexed chunks.");
            let view = PageView {
                notice: Some(&notice),
                ..Default::default()
            };
            (StatusCode::OK, Html(render_page(&session.status(), &view)))
        }
        Err(e) => {
            e.log();
            let message = e.user_message(state.expose_error_detail);
            let view = PageView {
                error: Some(&message),
                ..Default::default()
            };
            (e.status_code(), Html(render_page(&session.status(), &view)))
        }
    }
}

async fn read_uploads(mut multipart: Multipart) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
        // Browsers send an empty part when no file was picked.
        if filename.is_empty() && bytes.is_empty() {
            continue;
        }
        let filename = if filename.is_empty() {
            format!("upload-{}.pdf", files.len() + 1)
        } else {
            filename
        };
        files.push(UploadedFile { filename, bytes });
    }
    Ok(files)
}
