//! Shared HTML building blocks for the analyzer and dashboard pages
//!
//! Pages are rendered server-side with `format!`; every interpolated value
//! goes through [`escape_html`].

use crate::species::SpeciesRecord;

/// Styles shared by every Species Lens page
pub const SHARED_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
    background-color: #1a1a1a;
    color: #e0e0e0;
    line-height: 1.6;
}
header {
    background-color: #2a2a2a;
    border-bottom: 1px solid #3a3a3a;
    padding: 20px;
    margin-bottom: 30px;
}
.header-content { display: flex; justify-content: space-between; align-items: center; }
.header-left { flex: 1; }
.header-right {
    text-align: right;
    font-size: 16px;
    color: #888;
    font-family: 'Courier New', monospace;
}
h1 { font-size: 26px; margin-bottom: 5px; color: #4a9eff; }
h2 { color: #4a9eff; margin: 20px 0 10px; }
.subtitle { color: #888; font-size: 16px; }
nav a { color: #4a9eff; margin-right: 15px; }
.content { padding: 0 20px 40px; }
.columns { display: flex; gap: 30px; align-items: flex-start; flex-wrap: wrap; }
.columns > div { flex: 1; min-width: 300px; }
img.species { max-width: 100%; border-radius: 4px; }
.caption { color: #888; text-align: center; }
table.record { border-collapse: collapse; margin: 10px 0; }
table.record th, table.record td { border: 1px solid #3a3a3a; padding: 6px 12px; text-align: left; }
table.record th { color: #4a9eff; font-weight: 600; }
.notice { padding: 10px 15px; border-radius: 4px; margin: 10px 0; }
.notice-success { background: #064e3b; color: #4ade80; }
.notice-warning { background: #78350f; color: #fcd34d; }
.notice-error { background: #7f1d1d; color: #fca5a5; }
.button, button {
    display: inline-block;
    padding: 10px 20px;
    background: #4a9eff;
    color: white;
    border: none;
    text-decoration: none;
    border-radius: 4px;
    margin: 10px 5px 10px 0;
    font-weight: 600;
    cursor: pointer;
}
.button:hover, button:hover { background: #3a8eef; }
button:disabled { background: #555; cursor: wait; }
select, input[type=file] { padding: 6px; margin: 5px 0; color: #e0e0e0; background: #2a2a2a; border: 1px solid #3a3a3a; }
"#;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Percent-encode a single URL path segment or query value
///
/// Only RFC 3986 unreserved characters pass through unchanged.
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Severity of a banner shown above page content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    fn class(self) -> &'static str {
        match self {
            NoticeKind::Success => "notice-success",
            NoticeKind::Warning => "notice-warning",
            NoticeKind::Error => "notice-error",
        }
    }
}

pub fn notice(kind: NoticeKind, message: &str) -> String {
    format!(
        r#"<div class="notice {}">{}</div>"#,
        kind.class(),
        escape_html(message)
    )
}

/// Two-column (field, value) table for a record
pub fn record_table(record: &SpeciesRecord) -> String {
    let rows: String = record
        .fields()
        .into_iter()
        .map(|(field, value)| {
            format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape_html(field),
                escape_html(&value)
            )
        })
        .collect();

    format!(
        "<table class=\"record\">\n<tr><th>Field</th><th>Value</th></tr>\n{}</table>",
        rows
    )
}

/// Full HTML document with the shared header
///
/// `body` is inserted as-is and must already be escaped.
pub fn page(title: &str, subtitle: &str, module: &str, nav: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>{title}</h1>
                <p class="subtitle">{subtitle}</p>
                <nav>{nav}</nav>
            </div>
            <div class="header-right">
                <div>{module} v{version}</div>
            </div>
        </div>
    </header>
    <div class="content">
{body}
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        subtitle = escape_html(subtitle),
        css = SHARED_CSS,
        nav = nav,
        module = escape_html(module),
        version = env!("CARGO_PKG_VERSION"),
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("Snow Leopard"), "Snow Leopard");
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("Snow_Leopard"), "Snow_Leopard");
        assert_eq!(encode_path_segment("Grévy's"), "Gr%C3%A9vy%27s");
        assert_eq!(encode_path_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_record_table_has_row_per_field() {
        let record = crate::species::tests::snow_leopard();
        let html = record_table(&record);

        assert_eq!(html.matches("<tr>").count(), 14);
        assert!(html.contains("<tr><th>common_name</th><td>Snow Leopard</td></tr>"));
        assert!(html.contains("<tr><th>iucn_id_no</th><td>22732</td></tr>"));
    }

    #[test]
    fn test_record_table_escapes_values() {
        let mut record = crate::species::tests::snow_leopard();
        record.wb_datanam = "<script>".to_string();
        assert!(record_table(&record).contains("&lt;script&gt;"));
    }

    #[test]
    fn test_notice_classes() {
        assert!(notice(NoticeKind::Warning, "careful").contains("notice-warning"));
        assert!(notice(NoticeKind::Error, "a < b").contains("a &lt; b"));
    }
}
