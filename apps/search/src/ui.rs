//! Server-rendered HTML for the single search page.
//!
//! Every piece of user- or model-supplied text goes through
//! `ammonia::clean_text` before it is placed in the document.

use std::fmt::Write;

use ammonia::clean_text;
use axum::http::StatusCode;

use crate::session::{FileOutcome, SessionStatus, UploadReport};
use crate::store::SearchResult;

const TITLE: &str = "Resume Skill Search Bot";

/// Everything the page can show for one interaction.
#[derive(Default)]
pub struct PageView<'a> {
    pub upload: Option<&'a UploadReport>,
    pub query: Option<&'a str>,
    pub answer: Option<&'a str>,
    pub results: &'a [SearchResult],
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

pub fn render_page(status: &SessionStatus, view: &PageView<'_>) -> String {
    let mut body = String::new();

    if let Some(config_error) = &status.config_error {
        // NoKey: nothing but the configuration message.
        let _ = write!(
            body,
            r#"<div class="error" id="config-error"><strong>Configuration error.</strong> {}</div>"#,
            clean_text(config_error)
        );
        return layout(&body);
    }

    if let Some(key) = &status.masked_key {
        let _ = write!(
            body,
            r#"<p class="meta">API key {} ({}) &middot; embeddings: {} &middot; {} indexed chunks</p>"#,
            clean_text(key),
            status.key_source.unwrap_or("unknown"),
            clean_text(&status.embedding_model),
            status.entry_count
        );
    }

    if let Some(error) = view.error {
        let _ = write!(body, r#"<div class="error" id="error">{}</div>"#, clean_text(error));
    }
    if let Some(notice) = view.notice {
        let _ = write!(body, r#"<div class="success">{}</div>"#, clean_text(notice));
    }

    body.push_str(
        r#"<form id="upload-form" action="/upload" method="post" enctype="multipart/form-data">
<label for="files">Upload Resumes (PDF)</label>
<input type="file" id="files" name="files" accept="application/pdf,.pdf" multiple>
<button type="submit">Index</button>
</form>"#,
    );

    if let Some(report) = view.upload {
        render_upload_report(&mut body, report);
    }

    if status.store_ready {
        let _ = write!(
            body,
            r#"<form id="query-form" action="/query" method="post">
<label for="q">Search skills (eg: Python, Java, ML)</label>
<input type="text" id="q" name="q" value="{}">
<button type="submit">Search</button>
</form>
<form id="clear-form" action="/clear" method="post"><button type="submit">Clear index</button></form>"#,
            clean_text(view.query.unwrap_or(""))
        );
    }

    if let Some(answer) = view.answer {
        let _ = write!(
            body,
            r#"<h2>Matching Candidates</h2><div class="success answer" id="answer">{}</div>"#,
            clean_text(answer)
        );
    }

    if !view.results.is_empty() {
        body.push_str(r#"<details id="sources"><summary>Retrieved resume excerpts</summary><ol>"#);
        for result in view.results {
            let _ = write!(
                body,
                r#"<li><span class="meta">{} &middot; page {} &middot; score {:.3}</span><pre>{}</pre></li>"#,
                clean_text(&result.entry.metadata.source),
                result.entry.metadata.page,
                result.score,
                clean_text(&result.entry.text)
            );
        }
        body.push_str("</ol></details>");
    }

    layout(&body)
}

fn render_upload_report(body: &mut String, report: &UploadReport) {
    let class = if report.failed_count() == 0 { "success" } else { "warning" };
    let _ = write!(
        body,
        r#"<div class="{class}" id="upload-report"><p>{}</p><ul>"#,
        clean_text(&report.summary())
    );
    for file in &report.files {
        let line = match &file.outcome {
            FileOutcome::Indexed { pages, chunks } => {
                format!("{}: {pages} page(s), {chunks} chunk(s)", file.filename)
            }
            FileOutcome::Failed { reason } => format!("{}: failed ({reason})", file.filename),
        };
        let _ = write!(body, "<li>{}</li>", clean_text(&line));
    }
    body.push_str("</ul></div>");
}

/// Minimal page for errors raised outside a session context.
pub fn render_error_page(status: StatusCode, message: &str) -> String {
    layout(&format!(
        r#"<div class="error" id="error"><strong>{}</strong> {}</div><p><a href="/">Back</a></p>"#,
        status.as_u16(),
        clean_text(message)
    ))
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{TITLE}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}
form {{ margin: 1rem 0; }}
.meta {{ color: #666; font-size: 0.85rem; }}
.error {{ background: #fde8e8; padding: 0.75rem; border-radius: 4px; }}
.warning {{ background: #fff6dd; padding: 0.75rem; border-radius: 4px; }}
.success {{ background: #e6f6ea; padding: 0.75rem; border-radius: 4px; }}
.answer, pre {{ white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>{TITLE}</h1>
{body}
</body>
</html>
"#
    )
}
