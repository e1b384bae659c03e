//! JavaScript snippets evaluated inside page sessions
//!
//! Detail pages on mobile layouts frequently scroll an inner panel instead
//! of the body, so every snippet resolves the container with the same
//! fallback chain before touching it.

/// Resolve the page's true scrollable container
const CONTAINER_EXPR: &str = "document.querySelector('.detail-container__body') || document.querySelector('#container') || document.body";

/// Probe scroll geometry of the detected container
///
/// Returned by value as a plain object; field names match what
/// `CdpPageSession::parse_geometry` expects.
pub const GEOMETRY_SCRIPT: &str = r#"
(() => {
    const scrollContainer = document.querySelector('.detail-container__body') || document.querySelector('#container') || document.body;
    return {
        width: window.innerWidth,
        height: window.innerHeight,
        scrollHeight: scrollContainer.scrollHeight,
        clientHeight: scrollContainer.clientHeight,
        scrollTop: scrollContainer.scrollTop,
        bodyScrollHeight: document.body.scrollHeight,
        documentScrollHeight: document.documentElement.scrollHeight,
        devicePixelRatio: window.devicePixelRatio || 1,
        containerSelector: scrollContainer.className || scrollContainer.tagName,
        hasScrollContainer: scrollContainer !== document.body
    };
})()
"#;

/// Read the page title
pub const TITLE_SCRIPT: &str = "document.title";

/// Scroll the container to an absolute offset
///
/// Sets both the container scrollTop and window scroll; pages that ignore
/// one usually honor the other.
pub fn scroll_to_script(offset: i64) -> String {
    format!(
        r#"
(() => {{
    const scrollContainer = {container};
    scrollContainer.scrollTop = {offset};
    window.scrollTo(0, {offset});
}})()
"#,
        container = CONTAINER_EXPR,
        offset = offset
    )
}

/// Scroll the container all the way down
pub fn scroll_to_bottom_script() -> String {
    format!(
        r#"
(() => {{
    const scrollContainer = {container};
    scrollContainer.scrollTop = scrollContainer.scrollHeight;
    window.scrollTo(0, document.body.scrollHeight);
}})()
"#,
        container = CONTAINER_EXPR
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_script_shape() {
        assert!(GEOMETRY_SCRIPT.contains(".detail-container__body"));
        assert!(GEOMETRY_SCRIPT.contains("#container"));
        assert!(GEOMETRY_SCRIPT.contains("document.body"));
        assert!(GEOMETRY_SCRIPT.contains("devicePixelRatio"));
    }

    #[test]
    fn test_scroll_to_script_embeds_offset() {
        let script = scroll_to_script(1500);
        assert!(script.contains("scrollTop = 1500"));
        assert!(script.contains("window.scrollTo(0, 1500)"));
    }

    #[test]
    fn test_scroll_to_bottom_targets_scroll_height() {
        let script = scroll_to_bottom_script();
        assert!(script.contains("scrollTop = scrollContainer.scrollHeight"));
    }
}
