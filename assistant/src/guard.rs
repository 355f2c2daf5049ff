use exam_planner_core::config::DEFAULT_GUARD_KEYWORDS;

/// Cheap keyword pre-filter for the first message of a conversation.
///
/// A miss only means the model call can be skipped; a hit never decides
/// anything on its own, the model still makes the final call.
#[derive(Debug, Clone)]
pub struct TopicalityGuard {
    keywords: Vec<String>,
}

impl Default for TopicalityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_KEYWORDS.iter().copied())
    }
}

impl TopicalityGuard {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_plausibly_exam_related(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.keywords.iter().any(|kw| lower.contains(kw.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}
