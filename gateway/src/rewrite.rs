//! Content rewriting for proxied payloads.
//!
//! Backends render absolute links (`href="/infer/"`) that would escape the
//! gateway mount prefix. Rewriting is purely textual: a targeted pass over the
//! routes a backend declares, then a catch-all pass over any remaining
//! `/`-rooted attribute or `fetch` literal. Values already under `/api/` are
//! left alone, so running the passes twice changes nothing.
//!
//! Known limitation: the catch-all pass rewrites every `/`-rooted value,
//! including protocol-relative URLs and attributes that merely end in
//! `href`/`src`/`action` (e.g. `data-src`).

use std::sync::LazyLock;

use axum::http::StatusCode;
use regex::{Captures, Regex};

/// Root under which every backend is mounted.
const MOUNT_ROOT: &str = "/api/";

/// Methods recognised in `xhr.open("METHOD", "/path")` calls.
const XHR_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

/// Sub-paths that serve scripts or stylesheets without a file extension.
const SCRIPT_ALIASES: [&str; 1] = ["main-js"];
const STYLE_ALIASES: [&str; 1] = ["style-css"];

const STYLE_BLOCK: &str = include_str!("../assets/home_button_style.html");
const SCRIPT_BLOCK: &str = include_str!("../assets/home_button_script.html");

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(href|src|action)="(/[^"]*)""#).expect("attribute regex")
});
static FETCH_DOUBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"fetch\("(/[^"]*)"\)"#).expect("fetch regex"));
static FETCH_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"fetch\('(/[^']*)'\)"#).expect("fetch regex"));

/// Gateway-facing prefix of a backend.
pub fn mount_prefix(key: &str) -> String {
    format!("/api/{}", key)
}

/// How a proxied response body is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Rewritten and decorated with the home button.
    Html,
    /// Rewritten only.
    Script,
    Stylesheet,
    Json,
    /// Relayed untouched.
    Opaque,
}

impl PayloadKind {
    /// Classify a backend response by status, content type and requested sub-path.
    pub fn classify(status: StatusCode, content_type: &str, sub_path: &str) -> Self {
        if content_type.contains("text/html") && status == StatusCode::OK {
            Self::Html
        } else if content_type.contains("javascript")
            || sub_path.ends_with(".js")
            || SCRIPT_ALIASES.contains(&sub_path)
        {
            Self::Script
        } else if sub_path.ends_with(".css") || STYLE_ALIASES.contains(&sub_path) {
            Self::Stylesheet
        } else if content_type.contains("application/json") {
            Self::Json
        } else {
            Self::Opaque
        }
    }

    /// Content type imposed on the relayed response.
    pub fn forced_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Html => Some("text/html; charset=utf-8"),
            Self::Script => Some("application/javascript"),
            Self::Stylesheet => Some("text/css"),
            Self::Json => Some("application/json"),
            Self::Opaque => None,
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Html | Self::Script)
    }
}

/// Rewrite absolute references in `content` so they resolve under `/api/{key}`.
pub fn rewrite_urls<'a>(
    content: &str,
    key: &str,
    known_paths: impl IntoIterator<Item = &'a str>,
) -> String {
    let prefix = mount_prefix(key);
    let mut text = content.to_string();

    for path in known_paths.into_iter().filter(|p| p.starts_with('/')) {
        for (from, to) in known_path_replacements(&prefix, path) {
            if text.contains(&from) {
                text = text.replace(&from, &to);
            }
        }
    }

    rewrite_remaining(&text, &prefix)
}

/// Exact replacements for one declared route.
fn known_path_replacements(prefix: &str, path: &str) -> Vec<(String, String)> {
    let mounted = format!("{}/{}", prefix, path.trim_start_matches('/'));
    let mut pairs = vec![(format!(r#"href="{path}""#), format!(r#"href="{mounted}""#))];
    if !path.ends_with('/') {
        pairs.push((format!(r#"href="{path}/""#), format!(r#"href="{mounted}/""#)));
    }
    pairs.push((format!(r#"src="{path}""#), format!(r#"src="{mounted}""#)));
    pairs.push((format!(r#"action="{path}""#), format!(r#"action="{mounted}""#)));
    pairs.push((format!(r#"fetch("{path}""#), format!(r#"fetch("{mounted}""#)));
    pairs.push((format!("fetch('{path}'"), format!("fetch('{mounted}'")));
    for method in XHR_METHODS {
        pairs.push((
            format!(r#"open("{method}", "{path}""#),
            format!(r#"open("{method}", "{mounted}""#),
        ));
        pairs.push((
            format!("open('{method}', '{path}'"),
            format!("open('{method}', '{mounted}'"),
        ));
    }
    pairs
}

/// Catch-all pass over `/`-rooted values not yet under the mount root.
fn rewrite_remaining(text: &str, prefix: &str) -> String {
    let text = ATTRIBUTE_RE.replace_all(text, |caps: &Captures| {
        if caps[2].starts_with(MOUNT_ROOT) {
            caps[0].to_string()
        } else {
            format!(r#"{}="{}{}""#, &caps[1], prefix, &caps[2])
        }
    });
    let text = FETCH_DOUBLE_RE.replace_all(&text, |caps: &Captures| {
        if caps[1].starts_with(MOUNT_ROOT) {
            caps[0].to_string()
        } else {
            format!(r#"fetch("{}{}")"#, prefix, &caps[1])
        }
    });
    let text = FETCH_SINGLE_RE.replace_all(&text, |caps: &Captures| {
        if caps[1].starts_with(MOUNT_ROOT) {
            caps[0].to_string()
        } else {
            format!("fetch('{}{}')", prefix, &caps[1])
        }
    });
    text.into_owned()
}

/// Add the "back to gateway" button and its Escape shortcut to an HTML page.
pub fn inject_home_button(html: &str) -> String {
    let styled = if html.contains("</head>") {
        html.replace("</head>", &format!("{STYLE_BLOCK}</head>"))
    } else if html.contains("<head>") {
        html.replace("<head>", &format!("<head>\n{STYLE_BLOCK}"))
    } else {
        format!("{STYLE_BLOCK}{html}")
    };

    if styled.contains("</body>") {
        styled.replace("</body>", &format!("{SCRIPT_BLOCK}</body>"))
    } else {
        format!("{styled}{SCRIPT_BLOCK}")
    }
}
