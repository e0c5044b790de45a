//! GET / - catalog of registered backends.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use model_gateway_common::{Descriptor, InputFeature, ModelSequence, OutputField, SingleModel};

use crate::registry::{BackendRecord, BackendStatus};
use crate::rewrite::mount_prefix;
use crate::state::AppState;

const PAGE_STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; background: #f4f6fb; color: #1f2933; }
header { background: #1f2933; color: #fff; padding: 24px 32px; }
main { padding: 24px 32px; }
.totals span { margin-right: 24px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 16px; }
.card { background: #fff; border-radius: 10px; padding: 16px 20px; box-shadow: 0 1px 4px rgba(0,0,0,0.08); }
.card h3 { margin: 0 0 4px 0; }
.meta { color: #616e7c; font-size: 13px; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; color: #fff; }
.badge.success { background: #2f9e44; }
.badge.failed { background: #e03131; }
.badge.unknown { background: #868e96; }
.open { display: inline-block; margin-top: 12px; color: #364fc7; font-weight: 600; text-decoration: none; }
"#;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(home))
}

async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    let records = state.registry.records().await;

    let mut singles = Vec::new();
    let mut sequences = Vec::new();
    for record in &records {
        let config = state.registry.config(&record.key).await;
        match config.as_deref().map(|c| &c.descriptor) {
            Some(Descriptor::Sequence(sequence)) => {
                sequences.push(render_sequence_card(record, sequence))
            }
            Some(Descriptor::Single(model)) => singles.push(render_single_card(record, model)),
            None => singles.push(render_fallback_card(record)),
        }
    }

    Html(render_page(&records, &singles, &sequences))
}

fn render_page(records: &[BackendRecord], singles: &[String], sequences: &[String]) -> String {
    let running = records.iter().filter(|r| r.is_live()).count();
    let failed = records
        .iter()
        .filter(|r| r.status == BackendStatus::Failed)
        .count();

    let mut body = format!(
        r#"<div class="totals"><span>Registered: <b>{}</b></span><span>Running: <b>{}</b></span><span>Failed: <b>{}</b></span></div>"#,
        records.len(),
        running,
        failed
    );

    if records.is_empty() {
        body.push_str("<p>No models registered.</p>");
    }
    if !singles.is_empty() {
        body.push_str(&format!(
            r#"<h2>Models</h2><div class="grid">{}</div>"#,
            singles.concat()
        ));
    }
    if !sequences.is_empty() {
        body.push_str(&format!(
            r#"<h2>Model Sequences</h2><div class="grid">{}</div>"#,
            sequences.concat()
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Model Gateway</title>
<style>{PAGE_STYLE}</style>
</head>
<body>
<header><h1>Model Gateway</h1></header>
<main>{body}</main>
</body>
</html>
"#
    )
}

fn render_single_card(record: &BackendRecord, model: &SingleModel) -> String {
    let mut details = String::new();
    if let Some(description) = &model.description {
        details.push_str(&format!("<p>{}</p>", escape(description)));
    }
    details.push_str(&feature_list("Inputs", &model.input_features));
    details.push_str(&output_list("Outputs", &model.output_template));

    card(record, &model.name, &model.version, "single", &details)
}

fn render_sequence_card(record: &BackendRecord, sequence: &ModelSequence) -> String {
    let stages: String = sequence
        .stages
        .iter()
        .map(|stage| {
            format!(
                "<li>{} <span class=\"meta\">({})</span></li>",
                escape(&stage.name),
                escape(&stage.id)
            )
        })
        .collect();
    let mut details = format!("<p class=\"meta\">Stages</p><ol>{stages}</ol>");
    details.push_str(&feature_list("Inputs", sequence.input_features()));
    details.push_str(&output_list("Outputs", sequence.output_template()));

    card(record, &sequence.name, &sequence.version, "sequence", &details)
}

fn render_fallback_card(record: &BackendRecord) -> String {
    card(record, &title_case(&record.key), "Unknown", "single", "")
}

fn card(record: &BackendRecord, name: &str, version: &str, kind: &str, details: &str) -> String {
    let status = record.status.as_str();
    let port = record
        .port
        .map(|p| format!(" &middot; port {}", p))
        .unwrap_or_default();
    let link = if record.is_live() {
        format!(
            r#"<a class="open" href="{}/">Open &rarr;</a>"#,
            escape(&mount_prefix(&record.key))
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="card"><h3>{name}</h3><div class="meta">{version} &middot; {kind} &middot; {key}{port}</div><span class="badge {status}">{status}</span>{details}{link}</div>"#,
        name = escape(name),
        version = escape(version),
        kind = kind,
        key = escape(&record.key),
        port = port,
        status = status,
        details = details,
        link = link,
    )
}

fn feature_list(title: &str, features: &[InputFeature]) -> String {
    if features.is_empty() {
        return String::new();
    }
    let items: String = features
        .iter()
        .map(|f| format!("<li>{} ({})</li>", escape(&f.name), f.kind))
        .collect();
    format!("<p class=\"meta\">{title}</p><ul>{items}</ul>")
}

fn output_list(title: &str, fields: &[OutputField]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let items: String = fields
        .iter()
        .map(|f| format!("<li>{} ({})</li>", escape(&f.name), f.kind))
        .collect();
    format!("<p class=\"meta\">{title}</p><ul>{items}</ul>")
}

/// `iris_model` -> `Iris Model`
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
