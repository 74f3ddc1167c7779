//! HTML and plain-text export.
//!
//! Export is a pure function of the document. Highlight marks (comments, annotations,
//! pending suggestions) produce no markup: suggested insertions and deletions both
//! appear as plain content.
//!
//! Inline styles are emitted per run: each maximal run of identically styled text is
//! wrapped on its own, bold innermost, so overlapping styles never produce crossed tags.

use crate::document::{Block, BlockType, Document, EntityId, EntityKind, InlineStyle};
use crate::table::Table;
use std::fmt::Write;

fn style_tag(style: InlineStyle) -> &'static str {
    match style {
        InlineStyle::Bold => "b",
        InlineStyle::Italic => "i",
        InlineStyle::Underline => "u",
        InlineStyle::Strikethrough => "s",
        InlineStyle::Subscript => "sub",
        InlineStyle::Superscript => "sup",
    }
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn link_target(doc: &Document, id: EntityId) -> Option<String> {
    let entity = doc.entity(id)?;
    if entity.kind != EntityKind::Link {
        return None;
    }
    let data = &entity.data;
    if let Some(href) = data.get("url").and_then(|v| v.as_str()) {
        return Some(format!("href=\"{}\"", escape_attribute(href)));
    }
    if let Some(href) = data.pointer("/link/href").and_then(|v| v.as_str()) {
        return Some(format!("href=\"{}\"", escape_attribute(href)));
    }
    data.pointer("/link/attachment")
        .and_then(|v| v.as_str())
        .map(|attachment| format!("data-attachment=\"{}\"", escape_attribute(attachment)))
}

fn styled_run(block: &Block, start: usize, end: usize, out: &mut String) {
    let mut html = escape_text(block.slice_text(start, end));
    let styles = block.styles_at(start);
    for style in InlineStyle::ALL.into_iter().filter(|s| styles.contains(s)) {
        let tag = style_tag(style);
        html = format!("<{tag}>{html}</{tag}>");
    }
    out.push_str(&html);
}

fn styled_range(block: &Block, start: usize, end: usize, out: &mut String) {
    let mut cuts: Vec<usize> = vec![start, end];
    for span in block.styles().query_range(start, end) {
        cuts.push(span.start.clamp(start, end));
        cuts.push(span.end.clamp(start, end));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut run_start = start;
    for pair in cuts.windows(2) {
        let next = pair[1];
        if next < end && block.styles_at(next) == block.styles_at(run_start) {
            continue;
        }
        styled_run(block, run_start, next, out);
        run_start = next;
    }
}

/// Inline HTML of a block's text: styles and links.
fn inline_html(doc: &Document, block: &Block) -> String {
    let mut out = String::new();
    let len = block.len();
    let mut pos = 0;
    let links: Vec<(usize, usize, String)> = block
        .entities()
        .iter()
        .filter_map(|span| link_target(doc, span.value).map(|attr| (span.start, span.end, attr)))
        .collect();
    let mut links = links.into_iter().peekable();

    while pos < len {
        match links.peek() {
            Some((start, end, attr)) if *start <= pos => {
                let _ = write!(out, "<a {attr}>");
                styled_range(block, pos, (*end).min(len), &mut out);
                out.push_str("</a>");
                pos = (*end).min(len);
                links.next();
            }
            Some((start, _, _)) => {
                let until = (*start).min(len);
                styled_range(block, pos, until, &mut out);
                pos = until;
            }
            None => {
                styled_range(block, pos, len, &mut out);
                pos = len;
            }
        }
    }
    out
}

fn atomic_html(doc: &Document, block: &Block) -> Option<String> {
    let entity = doc.entity(block.entity_at(0)?)?;
    let data = &entity.data;
    match entity.kind {
        EntityKind::Embed => {
            let html = data
                .get("html")
                .or_else(|| data.pointer("/data/html"))
                .and_then(|v| v.as_str())?;
            Some(format!("<div class=\"embed-block\">{html}</div>"))
        }
        EntityKind::Image | EntityKind::Media => {
            let src = data
                .get("src")
                .or_else(|| data.pointer("/media/renditions/original/href"))
                .and_then(|v| v.as_str())?;
            let alt = data
                .get("alt")
                .or_else(|| data.pointer("/media/alt_text"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let mut html = format!(
                "<figure><img src=\"{}\" alt=\"{}\" />",
                escape_attribute(src),
                escape_attribute(alt)
            );
            if let Some(caption) = data
                .get("caption")
                .or_else(|| data.pointer("/media/description_text"))
                .and_then(|v| v.as_str())
            {
                let _ = write!(html, "<figcaption>{}</figcaption>", escape_text(caption));
            }
            html.push_str("</figure>");
            Some(html)
        }
        _ => None,
    }
}

fn cell_html(doc: &Document, table: &Table, row: usize, col: usize) -> String {
    table
        .cell(row, col)
        .map(|cell| {
            cell.blocks()
                .iter()
                .map(|block| format!("<p>{}</p>", inline_html(doc, block)))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn table_html(doc: &Document, table: &Table) -> String {
    let mut out = String::from("<table>");
    let body_start = if table.with_header() && table.rows() > 0 {
        out.push_str("<thead><tr>");
        for col in 0..table.cols() {
            let _ = write!(out, "<th>{}</th>", cell_html(doc, table, 0, col));
        }
        out.push_str("</tr></thead>");
        1
    } else {
        0
    };
    out.push_str("<tbody>");
    for row in body_start..table.rows() {
        out.push_str("<tr>");
        for col in 0..table.cols() {
            let _ = write!(out, "<td>{}</td>", cell_html(doc, table, row, col));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

fn list_tag(kind: BlockType) -> Option<&'static str> {
    match kind {
        BlockType::UnorderedListItem => Some("ul"),
        BlockType::OrderedListItem => Some("ol"),
        _ => None,
    }
}

/// Render the document as HTML, one top-level element per line.
///
/// Empty text blocks are skipped; consecutive list items of the same kind share one
/// list element.
pub fn to_html(doc: &Document) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut open_list: Option<(&'static str, Vec<String>)> = None;

    for block in doc.blocks() {
        let tag = list_tag(block.kind());
        if let Some((open, items)) = open_list.take() {
            if Some(open) == tag {
                open_list = Some((open, items));
            } else {
                parts.push(format!("<{open}>\n{}\n</{open}>", items.join("\n")));
            }
        }
        if let Some(tag) = tag {
            let item = format!("  <li>{}</li>", inline_html(doc, block));
            match open_list.as_mut() {
                Some((_, items)) => items.push(item),
                None => open_list = Some((tag, vec![item])),
            }
            continue;
        }

        let html = match block.kind() {
            BlockType::Table => block.table().map(|table| table_html(doc, table)),
            BlockType::Atomic => atomic_html(doc, block),
            _ if block.is_empty() => None,
            BlockType::Blockquote => Some(format!("<blockquote>{}</blockquote>", inline_html(doc, block))),
            BlockType::CodeBlock => Some(format!("<pre><code>{}</code></pre>", inline_html(doc, block))),
            kind => match kind.heading_level() {
                Some(level) => Some(format!("<h{level}>{}</h{level}>", inline_html(doc, block))),
                None => Some(format!("<p>{}</p>", inline_html(doc, block))),
            },
        };
        parts.extend(html);
    }
    if let Some((open, items)) = open_list {
        parts.push(format!("<{open}>\n{}\n</{open}>", items.join("\n")));
    }
    parts.join("\n")
}

/// Plain text: blocks joined by newlines; table rows on their own lines with cells
/// separated by tabs.
pub fn to_plain_text(doc: &Document) -> String {
    let lines: Vec<String> = doc
        .blocks()
        .map(|block| match block.table() {
            Some(table) => (0..table.rows())
                .map(|row| {
                    (0..table.cols())
                        .map(|col| table.cell(row, col).map(|cell| cell.text()).unwrap_or_default())
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => block.text().to_string(),
        })
        .collect();
    lines.join("\n")
}

/// Number of characters in every block, table cells included.
pub fn character_count(doc: &Document) -> usize {
    doc.all_blocks().map(Block::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Entity;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_simple_styles() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "one two three")
                .with_style(0, 3, InlineStyle::Bold)
                .with_style(4, 7, InlineStyle::Subscript),
        ])
        .unwrap();
        assert_eq!(to_html(&doc), "<p><b>one</b> <sub>two</sub> three</p>");
    }

    #[test]
    fn test_overlapping_styles_nest_per_run() {
        let doc = Document::from_blocks(vec![
            Block::new("a", BlockType::Unstyled, "abcdef")
                .with_style(0, 4, InlineStyle::Bold)
                .with_style(2, 6, InlineStyle::Underline),
        ])
        .unwrap();
        assert_eq!(to_html(&doc), "<p><b>ab</b><u><b>cd</b></u><u>ef</u></p>");
    }

    #[test]
    fn test_block_types_and_lists() {
        let doc = Document::from_blocks(vec![
            Block::new("h", BlockType::HeaderTwo, "Title"),
            Block::new("l1", BlockType::OrderedListItem, "first"),
            Block::new("l2", BlockType::OrderedListItem, "second"),
            Block::new("u1", BlockType::UnorderedListItem, "bullet"),
            Block::new("e", BlockType::Unstyled, ""),
            Block::new("q", BlockType::Blockquote, "a < b & c"),
            Block::new("c", BlockType::CodeBlock, "let x;"),
        ])
        .unwrap();
        assert_eq!(
            to_html(&doc),
            "<h2>Title</h2>\n<ol>\n  <li>first</li>\n  <li>second</li>\n</ol>\n<ul>\n  <li>bullet</li>\n</ul>\n\
             <blockquote>a &lt; b &amp; c</blockquote>\n<pre><code>let x;</code></pre>"
        );
    }

    #[test]
    fn test_links() {
        let mut entities = BTreeMap::new();
        entities.insert(EntityId(0), Entity::link("https://example.com/?a=1&b=\"2\""));
        let doc = Document::new(
            vec![
                Block::new("a", BlockType::Unstyled, "see this page")
                    .with_entity(4, 8, EntityId(0))
                    .with_style(0, 6, InlineStyle::Bold),
            ],
            entities,
        )
        .unwrap();
        assert_eq!(
            to_html(&doc),
            "<p><b>see </b><a href=\"https://example.com/?a=1&amp;b=&quot;2&quot;\"><b>th</b>is</a> page</p>"
        );
    }

    #[test]
    fn test_table() {
        let doc = Document::from_text("");
        let (doc, cursor) = crate::table::add_table(&doc, &crate::Selection::caret("b0", 0), 2, 2).unwrap();
        let doc = crate::table::set_cell_text(&doc, &cursor, "head").unwrap();
        let doc = crate::table::toggle_table_header(&doc, &cursor).unwrap();
        let cell = crate::table::TableCursor::new(cursor.block.clone(), 1, 1);
        let doc = crate::table::set_cell_text(&doc, &cell, "body").unwrap();
        assert_eq!(
            to_html(&doc),
            "<table><thead><tr><th><p>head</p></th><th></th></tr></thead>\
             <tbody><tr><td></td><td><p>body</p></td></tr></tbody></table>"
        );
        assert_eq!(to_plain_text(&doc), "\nhead\t\n\tbody");
        assert_eq!(character_count(&doc), 8);
    }
}
