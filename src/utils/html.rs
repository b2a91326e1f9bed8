use ammonia;

/// Sanitize user-supplied text (question bodies, options, notification
/// messages) before it is stored. Whitelist-based: safe inline tags survive,
/// <script>/<iframe> and event-handler attributes are stripped. Fail-safe
/// against stored XSS reaching any client that renders this content as HTML.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("What is 2+2? <script>alert(1)</script>");
        assert!(!cleaned.contains("script"));
        assert!(cleaned.contains("What is 2+2?"));
    }
}
