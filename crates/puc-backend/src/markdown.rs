use pulldown_cmark::{Options, Parser, html};

/// Render Markdown to HTML with tables and strikethrough enabled.
#[must_use]
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::render_markdown;

    #[test]
    fn renders_headings_and_lists() {
        let html = render_markdown("## 1.1\n\n* Fixed a bug\n* Added ~~nothing~~ a feature\n");

        assert!(html.contains("<h2>1.1</h2>"));
        assert!(html.contains("<li>Fixed a bug</li>"));
        assert!(html.contains("<del>nothing</del>"));
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render_markdown("").is_empty());
    }
}
