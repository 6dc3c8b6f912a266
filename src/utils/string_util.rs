pub trait StripCodeBlock {
    fn strip_code_block(&self) -> &str;
}

impl StripCodeBlock for str {
    /// Remove a surrounding Markdown fence (```` ```json ... ``` ````) if present.
    fn strip_code_block(&self) -> &str {
        let trimmed = self.trim();
        if trimmed.starts_with("```")
            && let Some(pos) = trimmed.find('\n')
        {
            let inner = &trimmed[pos + 1..];
            if let Some(inner) = inner.trim_end().strip_suffix("```") {
                return inner.trim();
            }
        }
        trimmed
    }
}
