//! Human readable rendering of backups, restores and the non-admin objects.
//!
//! Rendering is pure: callers fetch everything first (objects, artifacts,
//! correlated records) and pass it in together with the current time.

use std::{
    collections::BTreeMap,
    fmt::{Display, Write as _},
};

use k8s_openapi::{
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time},
    jiff::Timestamp,
};

use crate::{
    builder::display_selector,
    crd::{
        nonadmin::Condition,
        velero::{DataProgress, SecretKeyReference},
    },
    download::{DownloadTargetKind, Section},
};

mod backup;
mod nonadmin;
mod request;
mod restore;
pub mod table;

pub use backup::{BackupDetails, describe_backup};
pub use nonadmin::{
    describe_non_admin_backup, describe_non_admin_backup_storage_location,
    describe_non_admin_restore,
};
pub use request::describe_request;
pub use restore::{RestoreDetails, describe_restore};

/// Column the values of [`Describer::field`] start at.
const LABEL_WIDTH: usize = 26;

const INDENT: &str = "  ";

/// Accumulates the lines of a `describe` output.
#[derive(Debug, Default)]
pub struct Describer {
    out: String,
    depth: usize,
}

impl Describer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `label: value`, with values aligned across fields of the same
    /// depth.
    pub fn field(&mut self, label: &str, value: impl Display) -> &mut Self {
        let label = format!("{label}:");
        let width = LABEL_WIDTH.saturating_sub(self.depth * INDENT.len());
        let line = format!("{label:<width$}{value}");
        self.line(line.trim_end())
    }

    pub fn line(&mut self, text: impl Display) -> &mut Self {
        let _ = writeln!(self.out, "{}{text}", INDENT.repeat(self.depth));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Starts a section with an empty line and a `title:` line. The body is
    /// rendered one level deeper.
    pub fn section(&mut self, title: &str, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.blank();
        self.line(format_args!("{title}:"));
        self.nested(body)
    }

    pub fn nested(&mut self, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self
    }

    /// Writes a multi line text at the current depth.
    pub fn text(&mut self, text: &str) -> &mut Self {
        for line in text.lines() {
            if line.is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Optional booleans are left to the server when unset.
pub fn format_bool(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "auto",
    }
}

pub fn format_optional(value: Option<impl Display>) -> String {
    value.map_or_else(|| "<none>".to_owned(), |value| value.to_string())
}

/// Renders an include list, where empty means everything.
pub fn format_included(values: &[String]) -> String {
    if values.is_empty() {
        "*".to_owned()
    } else {
        values.join(", ")
    }
}

/// Renders an exclude list, where empty means nothing.
pub fn format_excluded(values: &[String]) -> String {
    if values.is_empty() {
        "<none>".to_owned()
    } else {
        values.join(", ")
    }
}

/// Renders labels or annotations as `key=value,...`.
pub fn format_map(map: Option<&BTreeMap<String, String>>) -> String {
    match map {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(","),
        _ => "<none>".to_owned(),
    }
}

/// Writes the name, namespace, labels and annotations of an object.
pub fn describe_metadata(describer: &mut Describer, metadata: &ObjectMeta) {
    describer
        .field("Name", metadata.name.as_deref().unwrap_or_default())
        .field("Namespace", metadata.namespace.as_deref().unwrap_or_default())
        .field("Labels", format_map(metadata.labels.as_ref()))
        .field("Annotations", format_map(metadata.annotations.as_ref()));
}

pub fn format_selector(selector: Option<&LabelSelector>) -> String {
    display_selector(selector)
}

pub fn format_or_selectors(selectors: &[LabelSelector]) -> String {
    if selectors.is_empty() {
        "<none>".to_owned()
    } else {
        selectors
            .iter()
            .map(|selector| display_selector(Some(selector)))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

pub fn format_credential(credential: Option<&SecretKeyReference>) -> String {
    credential.map_or_else(
        || "<none>".to_owned(),
        |credential| format!("{}={}", credential.name, credential.key),
    )
}

/// Renders a timestamp as RFC 3339 together with its distance to `now`.
pub fn format_time(time: Option<&Time>, now: Timestamp) -> String {
    let Some(Time(timestamp)) = time else {
        return "<n/a>".to_owned();
    };

    let seconds = timestamp.as_second() - now.as_second();
    if seconds > 0 {
        format!("{timestamp} (in {})", human_age(seconds))
    } else {
        format!("{timestamp} ({} ago)", human_age(-seconds))
    }
}

/// Renders the age of an object the way `kubectl get` does.
pub fn format_age(time: Option<&Time>, now: Timestamp) -> String {
    match time {
        Some(Time(timestamp)) => human_age((now.as_second() - timestamp.as_second()).max(0)),
        None => "<unknown>".to_owned(),
    }
}

/// Renders the time left until `time`, for the EXPIRES column of `get`.
pub fn format_expires(time: Option<&Time>, now: Timestamp) -> String {
    match time {
        Some(Time(timestamp)) if *timestamp > now => {
            human_age(timestamp.as_second() - now.as_second())
        }
        Some(_) => "expired".to_owned(),
        None => "n/a".to_owned(),
    }
}

fn human_age(seconds: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    match seconds {
        s if s < MINUTE => format!("{s}s"),
        s if s < HOUR => format!("{}m", s / MINUTE),
        s if s < DAY => format!("{}h", s / HOUR),
        s => format!("{}d", s / DAY),
    }
}

pub fn format_progress(progress: Option<&DataProgress>) -> String {
    match progress {
        Some(DataProgress {
            total_bytes: Some(total),
            bytes_done,
        }) => format!("{}/{total} bytes", bytes_done.unwrap_or_default()),
        _ => "<none>".to_owned(),
    }
}

pub fn describe_conditions(describer: &mut Describer, conditions: &[Condition]) {
    describer.section("Conditions", |d| {
        if conditions.is_empty() {
            d.line("<none>");
        }
        for condition in conditions {
            d.line(format_args!("{}={}", condition.type_, condition.status));
            d.nested(|d| {
                if let Some(reason) = &condition.reason {
                    d.field("Reason", reason);
                }
                if let Some(message) = condition.message.as_deref().filter(|m| !m.is_empty()) {
                    d.field("Message", message);
                }
            });
        }
    });
}

/// Writes the fetched artifacts, in the order they were fetched.
pub fn describe_sections(describer: &mut Describer, sections: &[Section]) {
    for section in sections {
        describer.section(section.kind.section_title(), |d| {
            d.text(&render_artifact(section.kind, &section.content));
        });
    }
}

/// Formats an artifact. JSON artifacts are pretty printed, results and
/// resource lists get a dedicated layout.
fn render_artifact(kind: DownloadTargetKind, content: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return content.trim_end().to_owned();
    };

    match kind {
        DownloadTargetKind::BackupResourceList | DownloadTargetKind::RestoreResourceList => {
            render_resource_list(&value)
        }
        DownloadTargetKind::BackupResults | DownloadTargetKind::RestoreResults => {
            render_results(&value)
        }
        _ => serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_owned()),
    }
}

fn render_resource_list(value: &serde_json::Value) -> String {
    let Some(kinds) = value.as_object() else {
        return value.to_string();
    };
    if kinds.is_empty() {
        return "<none>".to_owned();
    }

    let mut out = String::new();
    for (kind, names) in kinds {
        let _ = writeln!(out, "{kind}:");
        for name in names.as_array().into_iter().flatten() {
            let _ = writeln!(out, "{INDENT}- {}", name.as_str().unwrap_or_default());
        }
    }
    out
}

/// Results are `{"errors": {...}, "warnings": {...}}`, each grouped into
/// `velero`, `cluster` and per namespace messages.
fn render_results(value: &serde_json::Value) -> String {
    let mut out = String::new();
    for (key, title) in [("warnings", "Warnings"), ("errors", "Errors")] {
        let messages = collect_messages(&value[key]);
        let _ = writeln!(out, "{title}:");
        if messages.is_empty() {
            let _ = writeln!(out, "{INDENT}<none>");
        }
        for (scope, message) in messages {
            let _ = writeln!(out, "{INDENT}{scope}: {message}");
        }
    }
    out
}

fn collect_messages(result: &serde_json::Value) -> Vec<(String, String)> {
    let strings = |value: &serde_json::Value| -> Vec<String> {
        value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|message| message.as_str().map(str::to_owned))
            .collect()
    };

    let mut messages = Vec::new();
    for scope in ["velero", "cluster"] {
        for message in strings(&result[scope]) {
            messages.push((scope.to_owned(), message));
        }
    }
    if let Some(namespaces) = result["namespaces"].as_object() {
        for (namespace, list) in namespaces {
            for message in strings(list) {
                messages.push((namespace.clone(), message));
            }
        }
    }
    messages
}
