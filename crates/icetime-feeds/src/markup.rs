//! Cell extraction from shift report markup
//!
//! The report is a table-based document. Only cells whose `class` attribute
//! contains the configured marker class are kept; their inner markup is
//! stripped and entities are decoded, leaving plain text in source order.

use std::sync::OnceLock;

use regex::Regex;

fn cell_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r#"(?is)<td\b[^>]*\bclass\s*=\s*["']([^"']*)["'][^>]*>(.*?)</td\s*>"#)
            .unwrap_or_else(|e| unreachable!("static cell pattern: {e}"))
    })
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"(?s)<[^>]*>").unwrap_or_else(|e| unreachable!("static tag pattern: {e}"))
    })
}

/// Extract the text of every `<td>` whose class list contains `cell_class`.
pub fn extract_cells(markup: &str, cell_class: &str) -> Vec<String> {
    cell_regex()
        .captures_iter(markup)
        .filter(|caps| {
            caps.get(1)
                .map(|classes| classes.as_str().split_whitespace().any(|c| c == cell_class))
                .unwrap_or(false)
        })
        .map(|caps| cell_text(caps.get(2).map(|m| m.as_str()).unwrap_or_default()))
        .collect()
}

/// Plain text of a cell: tags removed, `<br>` as a space, entities decoded,
/// whitespace collapsed.
pub fn cell_text(inner: &str) -> String {
    let without_tags = tag_regex().replace_all(inner, " ");
    let decoded = decode_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of entities report generators emit.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };

        let entity = &tail[1..end];
        let decoded = match entity {
            "nbsp" => Some(' '),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
