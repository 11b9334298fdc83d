//! Plain-text rendering shared by the registry and connect commands.

use std::fmt::Write as _;

use mc_mcp_client::{CallToolResult, Content, GetPromptResult, ReadResourceResult};

/// Gap between table columns.
const COLUMN_GAP: usize = 2;

/// Cut `s` to at most `max` characters, ending in `...` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Left-aligned text table with a dashed rule under the header.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    indent: usize,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = spaces;
        self
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let rule: Vec<String> = self.headers.iter().map(|h| "-".repeat(h.chars().count())).collect();
        let lines: Vec<&[String]> = std::iter::once(self.headers.as_slice())
            .chain(std::iter::once(rule.as_slice()))
            .chain(self.rows.iter().map(Vec::as_slice))
            .collect();

        let columns = lines.iter().map(|l| l.len()).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for line in &lines {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for line in lines {
            let mut text = " ".repeat(self.indent);
            for (i, cell) in line.iter().enumerate() {
                text.push_str(cell);
                if i + 1 < line.len() {
                    let pad = widths[i] - cell.chars().count() + COLUMN_GAP;
                    text.push_str(&" ".repeat(pad));
                }
            }
            out.push_str(text.trim_end());
            out.push('\n');
        }
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn write_content(out: &mut String, content: &Content) {
    match content.content_type.as_str() {
        "text" => {
            let text = content.text.as_deref().unwrap_or_default().trim();
            for line in text.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
        "image" | "audio" => {
            let mime = content.mime_type.as_deref().unwrap_or("unknown");
            let len = content.data.as_deref().map_or(0, str::len);
            let _ = writeln!(out, "    [{} {mime}: {len} bytes base64]", content.content_type);
        }
        "resource" => match &content.resource {
            Some(res) => {
                let _ = writeln!(out, "    [resource {}]", res.uri);
                if let Some(text) = &res.text {
                    for line in text.trim().lines() {
                        let _ = writeln!(out, "    {line}");
                    }
                }
            }
            None => {
                let _ = writeln!(out, "    [resource]");
            }
        },
        other => {
            let extra = serde_json::to_string(&content.extra).unwrap_or_default();
            let _ = writeln!(out, "    [{other}] {extra}");
        }
    }
}

pub fn render_tool_result(name: &str, result: &CallToolResult) -> String {
    let mut out = String::new();
    if result.is_error {
        let _ = writeln!(out, "Tool '{name}' reported an error:");
    } else {
        let _ = writeln!(out, "Tool '{name}' result:");
    }
    for (i, content) in result.content.iter().enumerate() {
        if result.content.len() > 1 {
            let _ = writeln!(out, "  Content {} ({}):", i + 1, content.content_type);
        }
        write_content(&mut out, content);
    }
    if let Some(structured) = &result.structured_content {
        let pretty = serde_json::to_string_pretty(structured).unwrap_or_default();
        let _ = writeln!(out, "  Structured content:\n{pretty}");
    }
    out
}

pub fn render_resource(result: &ReadResourceResult) -> String {
    let mut out = String::new();
    for item in &result.contents {
        let mime = item.mime_type.as_deref().unwrap_or("unknown");
        match (&item.text, &item.blob) {
            (Some(text), _) => {
                let _ = writeln!(out, "{} ({mime}):", item.uri);
                let _ = writeln!(out, "{text}");
            }
            (None, Some(blob)) => {
                let _ = writeln!(out, "{} ({mime}): [blob, {} bytes base64]", item.uri, blob.len());
            }
            (None, None) => {
                let _ = writeln!(out, "{} ({mime}): [empty]", item.uri);
            }
        }
    }
    out
}

pub fn render_prompt(name: &str, result: &GetPromptResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Prompt '{name}'");
    if let Some(description) = result.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "  {description}");
    }
    for message in &result.messages {
        let _ = writeln!(out, "  [{}]", message.role);
        write_content(&mut out, &message.content);
    }
    out
}
