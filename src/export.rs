/// Export of saved entries: pretty JSON, CSV, Markdown and a printable
/// HTML document. All four are pure transforms of the entry list.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

use crate::schema::fields::AssetKind;
use crate::schema::record::SavedEntry;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No history to export.")]
    EmptyHistory,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    #[serde(alias = "md")]
    Markdown,
    #[serde(alias = "pdf")]
    Print,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Json, Self::Csv, Self::Markdown, Self::Print];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" | "print" | "html" => Some(Self::Print),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Markdown => "md",
            Self::Print => "html",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv;charset=utf-8;",
            Self::Markdown => "text/markdown;charset=utf-8;",
            Self::Print => "text/html;charset=utf-8;",
        }
    }
}

/// A rendered export, ready to hand to a download or print window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

pub fn file_name(kind: AssetKind, format: ExportFormat) -> String {
    format!("instantforge_{}_history.{}", kind.name(), format.extension())
}

/// Render `entries` in `format`. An empty list is a user error.
pub fn export(
    kind: AssetKind,
    entries: &[SavedEntry],
    format: ExportFormat,
) -> Result<ExportDocument, ExportError> {
    if entries.is_empty() {
        return Err(ExportError::EmptyHistory);
    }
    let content = match format {
        ExportFormat::Json => to_json(entries)?,
        ExportFormat::Csv => to_csv(kind, entries),
        ExportFormat::Markdown => to_markdown(kind, entries),
        ExportFormat::Print => to_print_html(kind, entries),
    };
    Ok(ExportDocument {
        file_name: file_name(kind, format),
        mime_type: format.mime_type(),
        content,
    })
}

pub fn to_json(entries: &[SavedEntry]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Parse a JSON export back into entries.
pub fn from_json(input: &str) -> Result<Vec<SavedEntry>, ExportError> {
    Ok(serde_json::from_str(input)?)
}

/// Quote a CSV cell: `"` doubled, line breaks collapsed to a space.
pub fn escape_csv(value: &str) -> String {
    let flat = value
        .replace("\r\n", " ")
        .replace(|c: char| c == '\r' || c == '\n', " ");
    format!("\"{}\"", flat.replace('"', "\"\""))
}

pub fn to_csv(kind: AssetKind, entries: &[SavedEntry]) -> String {
    let columns = kind.columns();
    let mut out = columns.iter().map(|c| c.key).collect::<Vec<_>>().join(",");
    out.push('\n');
    for entry in entries {
        let row: Vec<String> = columns.iter().map(|c| escape_csv(entry.field(c.key))).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn to_markdown(kind: AssetKind, entries: &[SavedEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mut section = format!("## {}\n*{}*", entry.name(), entry.subtitle());
            for column in kind.body_columns() {
                let _ = write!(section, "\n\n**{}**\n{}", column.label, entry.field(column.key));
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PRINT_STYLES: &str = "<style>\
body { font-family: 'Lora', serif; color: #333; }\
h1, h2 { font-family: 'MedievalSharp', cursive; }\
h2 { font-size: 22pt; margin-bottom: 0; }\
.subtitle { font-size: 11pt; color: #666; margin-top: 0; }\
.output-group { margin-bottom: 1em; }\
.output-group strong { color: #8B0000; display: block; font-size: 10pt; text-transform: uppercase; letter-spacing: 1px; }\
.output-group p { margin: 0.25em 0 0 0; padding-left: 1em; border-left: 2px solid #ccc; }\
hr { border: 0; height: 1px; background: #ccc; margin: 1em 0; }\
.entry-page { page-break-inside: avoid; margin-bottom: 2em; border-bottom: 1px solid #ccc; padding-bottom: 1em; }\
@media print { .entry-page { border-bottom: none; } }\
</style>";

/// A standalone HTML document with one unbreakable section per entry.
pub fn to_print_html(kind: AssetKind, entries: &[SavedEntry]) -> String {
    let mut body = String::new();
    for entry in entries {
        let _ = write!(
            body,
            "<div class=\"entry-page {}-page\"><h2>{}</h2><p class=\"subtitle\"><em>{}</em></p>",
            kind.name(),
            escape_html(entry.name()),
            escape_html(entry.subtitle())
        );
        for column in kind.body_columns() {
            let _ = write!(
                body,
                "<div class=\"output-group\"><strong>{}</strong><p>{}</p></div>",
                escape_html(column.label),
                escape_html(entry.field(column.key))
            );
            if column.key == kind.section_break_after() {
                body.push_str("<hr>");
            }
        }
        body.push_str("</div>");
    }
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title>{}</head><body><h1>{}</h1>{}</body></html>",
        kind.document_title(),
        PRINT_STYLES,
        kind.history_title(),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry(id: u64, pairs: &[(&str, &str)]) -> SavedEntry {
        let fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SavedEntry { id, fields }
    }

    fn tavern() -> SavedEntry {
        entry(
            7,
            &[
                ("name", "The Stag & Crow"),
                ("subtitle", "Poor Inn"),
                ("description", "Drafty.\nDamp."),
                ("innkeeper", "The innkeeper is \"jolly\"."),
                ("signatureDrink", "Grog"),
                ("patrons", "A nun."),
                ("rumor", "The well is haunted."),
            ],
        )
    }

    #[test]
    fn empty_history_is_refused() {
        for format in ExportFormat::ALL {
            assert!(matches!(
                export(AssetKind::Item, &[], format),
                Err(ExportError::EmptyHistory)
            ));
        }
    }

    #[test]
    fn csv_quotes_every_cell() {
        let csv = to_csv(AssetKind::Tavern, &[tavern()]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("name,subtitle,description,innkeeper,signatureDrink,patrons,rumor")
        );
        assert_eq!(
            lines.next(),
            Some(r#""The Stag & Crow","Poor Inn","Drafty. Damp.","The innkeeper is ""jolly"".","Grog","A nun.","The well is haunted.""#)
        );
        assert_eq!(escape_csv("a\r\nb\rc"), "\"a b c\"");
    }

    #[test]
    fn missing_fields_export_as_empty_cells() {
        let csv = to_csv(AssetKind::Npc, &[entry(1, &[("name", "Bree")])]);
        assert!(csv.ends_with("\"Bree\",\"\",\"\",\"\",\"\",\"\",\"\",\"\"\n"));
    }

    #[test]
    fn markdown_layout() {
        let md = to_markdown(AssetKind::Tavern, &[tavern(), tavern()]);
        assert!(md.starts_with("## The Stag & Crow\n*Poor Inn*\n\n**Description**\nDrafty.\nDamp."));
        assert!(md.contains("**Signature Drink**\nGrog\n\n**Patrons**"));
        assert_eq!(md.matches("\n\n---\n\n").count(), 1);
        assert!(md.ends_with("**Rumor**\nThe well is haunted."));
    }

    #[test]
    fn print_document_escapes_and_breaks_sections() {
        let html = to_print_html(AssetKind::Tavern, &[tavern()]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>InstantForge Tavern History</title>"));
        assert!(html.contains("<h1>Saved Taverns</h1>"));
        assert!(html.contains("The Stag &amp; Crow"));
        assert!(html.contains("&quot;jolly&quot;"));
        assert!(html.contains("<p>Grog</p></div><hr>"));
    }

    #[test]
    fn document_names() {
        let entries = [entry(1, &[("name", "Bree")])];
        let doc = export(AssetKind::Npc, &entries, ExportFormat::Markdown).unwrap();
        assert_eq!(doc.file_name, "instantforge_npc_history.md");
        assert_eq!(doc.mime_type, "text/markdown;charset=utf-8;");
        assert_eq!(ExportFormat::from_name("PDF"), Some(ExportFormat::Print));
    }

    #[test]
    fn json_export_round_trips() {
        let entries = vec![tavern(), entry(3, &[("name", "Other")])];
        let json = to_json(&entries).unwrap();
        assert_eq!(from_json(&json).unwrap(), entries);
    }
}
