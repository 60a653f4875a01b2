//! Markdown-to-HTML rendering for the preview pane.
//!
//! Delegates to pulldown-cmark. Raw HTML in the source is escaped to
//! text instead of passed through, so the output is safe to inject into
//! a preview element. Fenced code blocks keep their `language-*` class
//! so a syntax highlighter can hook in downstream.

use pulldown_cmark::{Event, Options, Parser, html};

/// Render markdown to sanitized HTML.
///
/// Pure and idempotent: the same input always produces the same output.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    // Remap raw HTML events to text so they render escaped
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}
