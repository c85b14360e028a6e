//! Conversion prompt.
//!
//! The template is fixed; page fields are substituted verbatim and only
//! escaped by JSON string encoding on the wire.

use crate::page::PageContent;

/// Builds the `turn/start` prompt for `page`.
#[must_use]
pub fn build_prompt(page: &PageContent) -> String {
    let title = page.title();
    let url = page.url();
    let body = page.body();

    format!(
        "Convert the following web page content to clean, well-structured Markdown.\n\
         \n\
         Instructions:\n\
         - Extract the MAIN article/content only. Skip navigation, sidebars, footers, ads, cookie banners, and boilerplate.\n\
         - Use proper Markdown hierarchy: # for the title, ## for major sections, ### for subsections.\n\
         - Preserve code blocks with language hints (```python, ```javascript, etc.) if present.\n\
         - Preserve links as [text](url) where possible.\n\
         - Use bullet lists and numbered lists where the original uses them.\n\
         - For tables, use Markdown table syntax.\n\
         - Keep the content faithful to the original — do not add commentary or summaries.\n\
         - At the very end, add a source line: `> Source: [{title}]({url})`\n\
         \n\
         Page title: {title}\n\
         Page URL: {url}\n\
         \n\
         --- PAGE CONTENT ---\n\
         {body}\n\
         --- END PAGE CONTENT ---"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_layout() {
        let page = PageContent::new("https://example.com/post", "A Post", "Line one\nLine two");
        let prompt = build_prompt(&page);

        assert!(prompt.starts_with(
            "Convert the following web page content to clean, well-structured Markdown.\n\nInstructions:\n- Extract"
        ));
        assert!(prompt.contains("`> Source: [A Post](https://example.com/post)`\n\nPage title: A Post\n"));
        assert!(prompt.contains("Page URL: https://example.com/post\n\n--- PAGE CONTENT ---\n"));
        assert!(prompt.ends_with("Line one\nLine two\n--- END PAGE CONTENT ---"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let page = PageContent::new("u", "t", "b");
        assert_eq!(build_prompt(&page), build_prompt(&page));
    }

    #[test]
    fn test_prompt_keeps_body_verbatim() {
        let page = PageContent::new("u", "t", "{\"quoted\"}\t<tag>");
        assert!(build_prompt(&page).contains("{\"quoted\"}\t<tag>"));
    }
}
