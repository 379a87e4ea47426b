//! Markdown formatting for assistant replies.
//!
//! Replies arrive as markdown; the ledger stores both a rendered HTML body
//! for display and a formatting-stripped body for copy and speech synthesis.

use pulldown_cmark::{Event, Parser, Tag, TagEnd, html};

/// Render a markdown reply to HTML.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut output, parser);
    output
}

/// Strip formatting from a markdown reply, keeping readable text only.
pub fn plain_text(markdown: &str) -> String {
    let mut output = String::with_capacity(markdown.len());
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => output.push_str(&text),
            Event::SoftBreak => output.push(' '),
            Event::HardBreak => output.push('\n'),
            Event::Start(Tag::Item) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_)) => output.push('\n'),
            _ => {}
        }
    }
    output.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{plain_text, render_html};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_markdown_to_html() {
        let html = render_html("Hi **there**!");
        assert_eq!(html, "<p>Hi <strong>there</strong>!</p>\n");
    }

    #[test]
    fn plain_text_strips_emphasis_and_code() {
        assert_eq!(plain_text("Hi **there**, try `cargo`."), "Hi there, try cargo.");
    }

    #[test]
    fn plain_text_separates_blocks() {
        let text = plain_text("First paragraph.\n\nSecond one.\n\n- a\n- b");
        assert_eq!(text, "First paragraph.\nSecond one.\na\nb");
    }
}
