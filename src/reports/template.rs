//! Report value objects and the single function that turns them into printable HTML.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::html::escape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Normal,
    Good,
    Warning,
    Critical,
}

impl Tone {
    fn class(&self) -> &'static str {
        match self {
            Tone::Normal => "normal",
            Tone::Good => "good",
            Tone::Warning => "warning",
            Tone::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            tone: Tone::Normal,
        }
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Shown instead of the table when there are no rows.
    pub empty_message: String,
}

impl Table {
    pub fn new(headers: &[&str], empty_message: impl Into<String>) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            empty_message: empty_message.into(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Metrics(Vec<Metric>),
    Table(Table),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
        }
    }

    pub fn metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.blocks.push(Block::Metrics(metrics));
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Text(text.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub subtitle: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Option<String>,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            generated_at: Utc::now(),
            generated_by: None,
            sections: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn generated_by(mut self, name: impl Into<String>) -> Self {
        self.generated_by = Some(name.into());
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

pub const REPORT_STYLES: &str = r#"
body { font-family: "Segoe UI", Arial, sans-serif; color: #1f2933; margin: 32px; }
header { border-bottom: 3px solid #2f855a; margin-bottom: 24px; padding-bottom: 12px; }
h1 { margin: 0; font-size: 24px; }
.subtitle { color: #52606d; margin-top: 4px; }
.meta { color: #7b8794; font-size: 12px; margin-top: 8px; }
section { margin-bottom: 28px; page-break-inside: avoid; }
h2 { font-size: 16px; text-transform: uppercase; letter-spacing: 0.05em; color: #2f855a; }
.metrics { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 12px; }
.metric { border: 1px solid #e4e7eb; border-radius: 6px; padding: 10px 12px; }
.metric .label { font-size: 11px; color: #7b8794; text-transform: uppercase; }
.metric .value { font-size: 20px; font-weight: 600; margin-top: 4px; }
.metric.good .value { color: #2f855a; }
.metric.warning .value { color: #b7791f; }
.metric.critical .value { color: #c53030; }
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #e4e7eb; }
th { background: #f5f7fa; font-weight: 600; }
.empty { color: #7b8794; font-style: italic; }
@media print { body { margin: 12mm; } .no-print { display: none; } }
"#;

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Metrics(metrics) => {
            out.push_str("<div class=\"metrics\">");
            for metric in metrics {
                out.push_str(&format!(
                    "<div class=\"metric {}\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
                    metric.tone.class(),
                    escape(&metric.label),
                    escape(&metric.value)
                ));
            }
            out.push_str("</div>");
        }
        Block::Table(table) if table.rows.is_empty() => {
            out.push_str(&format!("<p class=\"empty\">{}</p>", escape(&table.empty_message)));
        }
        Block::Table(table) => {
            out.push_str("<table><thead><tr>");
            for header in &table.headers {
                out.push_str(&format!("<th>{}</th>", escape(header)));
            }
            out.push_str("</tr></thead><tbody>");
            for row in &table.rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
        Block::Text(text) => out.push_str(&format!("<p>{}</p>", escape(text))),
    }
}

/// Self-contained document: inline styles, no scripts besides the print trigger.
pub fn render(report: &Report) -> String {
    let mut body = String::new();
    for section in &report.sections {
        body.push_str(&format!("<section><h2>{}</h2>", escape(&section.heading)));
        for block in &section.blocks {
            render_block(block, &mut body);
        }
        body.push_str("</section>");
    }

    let subtitle = report
        .subtitle
        .as_deref()
        .map(|s| format!("<div class=\"subtitle\">{}</div>", escape(s)))
        .unwrap_or_default();
    let generated_by = report
        .generated_by
        .as_deref()
        .map(|name| format!(" by {}", escape(name)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title}</title><style>{styles}</style></head>\
         <body><header><h1>{title}</h1>{subtitle}<div class=\"meta\">Generated {generated}{generated_by}</div></header>\
         {body}<button class=\"no-print\" onclick=\"window.print()\">Print</button></body></html>",
        title = escape(&report.title),
        styles = REPORT_STYLES,
        subtitle = subtitle,
        generated = report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        generated_by = generated_by,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_content() {
        let mut table = Table::new(&["Note"], "none");
        table.row(vec!["<script>alert(1)</script>".to_string()]);
        let report = Report::new("Bin <B1>")
            .generated_by("Ops & Co")
            .section(Section::new("History").table(table));

        let html = render(&report);
        assert!(html.contains("Bin &lt;B1&gt;"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("by Ops &amp; Co"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_empty_table_message() {
        let report = Report::new("R").section(Section::new("S").table(Table::new(&["A"], "No collections yet")));
        let html = render(&report);
        assert!(html.contains("<p class=\"empty\">No collections yet</p>"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_single_stylesheet() {
        let report = Report::new("R")
            .section(Section::new("A").metrics(vec![Metric::new("Fill", "90%").tone(Tone::Critical)]))
            .section(Section::new("B").text("ok"));
        let html = render(&report);
        assert_eq!(html.matches("<style>").count(), 1);
        assert!(html.contains("metric critical"));
    }
}
