use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::llm::LlmClient;

pub const MIN_DESCRIPTION_CHARS: usize = 40;
pub const MAX_DESCRIPTION_CHARS: usize = 250;

/// A sentence boundary earlier than this is ignored when cutting long text.
const SENTENCE_CUT_FLOOR: usize = 150;
const ELLIPSIS: &str = "...";
const PADDING: &str = " Designed for quality and everyday use.";
const EMPTY_TITLE_DESCRIPTION: &str = "Quality product available for purchase.";
const LABEL: &str = "description:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    Generated,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DescriptionResult {
    pub text: String,
    pub length: usize,
    pub source: DescriptionSource,
}

impl DescriptionResult {
    fn new(text: String, source: DescriptionSource) -> Self {
        Self { length: text.chars().count(), text, source }
    }
}

/// Product copy from the generative backend, with a keyword template when the
/// backend fails, times out or answers with nothing usable.
#[derive(Clone)]
pub struct DescriptionCascade {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl DescriptionCascade {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn describe(&self, title: &str) -> DescriptionResult {
        let prompt = description_prompt(title);

        match tokio::time::timeout(self.timeout, self.llm.complete(&prompt)).await {
            Ok(Ok(reply)) => match sanitize(&reply) {
                Some(text) => {
                    debug!(event_name = "describe.generated", title = %title);
                    return DescriptionResult::new(finalize(&text), DescriptionSource::Generated);
                }
                None => warn!(event_name = "describe.empty_reply", title = %title),
            },
            Ok(Err(error)) => {
                warn!(event_name = "describe.llm_failed", title = %title, error = %error)
            }
            Err(_) => warn!(
                event_name = "describe.llm_timeout",
                title = %title,
                timeout_ms = self.timeout.as_millis() as u64
            ),
        }

        DescriptionResult::new(finalize(&fallback_description(title)), DescriptionSource::Fallback)
    }
}

pub fn description_prompt(title: &str) -> String {
    format!(
        "You are a professional e-commerce copywriter. Create a compelling product description for: \"{title}\"\n\n\
         REQUIREMENTS:\n\
         - Write 2-3 sentences maximum\n\
         - Keep it between {MIN_DESCRIPTION_CHARS} and {MAX_DESCRIPTION_CHARS} characters\n\
         - Focus on benefits and key features\n\
         - Use engaging, sales-oriented language\n\
         - Don't use quotation marks in the response\n\
         - Keep it concise and professional\n\n\
         EXAMPLES:\n\
         Product: Organic Cotton Hoodie\n\
         Description: Cozy organic cotton hoodie with a relaxed fit. Soft and breathable, made to last through every season.\n\n\
         Product: Stainless Steel Water Bottle\n\
         Description: Keeps drinks cold for 24 hours in a leak-proof steel body. Light enough for any adventure.\n\n\
         Product: {title}\n\
         Description:"
    )
}

/// Strips the label and wrapping quotes a model tends to echo back.
/// `None` when nothing is left.
pub fn sanitize(reply: &str) -> Option<String> {
    let mut text = reply.trim();
    if text.get(..LABEL.len()).is_some_and(|head| head.eq_ignore_ascii_case(LABEL)) {
        text = text[LABEL.len()..].trim_start();
    }
    let text = text.trim_matches(|ch: char| matches!(ch, '"' | '\'' | '\u{201c}' | '\u{201d}'));

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Clamps to the description length bounds, capitalizes and terminates.
pub fn finalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars: Vec<char> = if collapsed.is_empty() {
        EMPTY_TITLE_DESCRIPTION.chars().collect()
    } else {
        collapsed.chars().collect()
    };

    if chars.len() > MAX_DESCRIPTION_CHARS {
        chars.truncate(MAX_DESCRIPTION_CHARS);
        match chars.iter().rposition(|ch| is_terminal(*ch)) {
            Some(boundary) if boundary >= SENTENCE_CUT_FLOOR => chars.truncate(boundary + 1),
            _ => {
                chars.truncate(MAX_DESCRIPTION_CHARS - ELLIPSIS.len());
                while chars.last().is_some_and(|ch| ch.is_whitespace()) {
                    chars.pop();
                }
                chars.extend(ELLIPSIS.chars());
            }
        }
    }

    if chars.len() < MIN_DESCRIPTION_CHARS {
        if !chars.last().copied().is_some_and(is_terminal) {
            chars.push('.');
        }
        chars.extend(PADDING.chars());
    }

    if let Some(first) = chars.first_mut() {
        let upper: Vec<char> = first.to_uppercase().collect();
        if let [single] = upper.as_slice() {
            *first = *single;
        }
    }

    if !chars.last().copied().is_some_and(is_terminal) {
        if chars.len() >= MAX_DESCRIPTION_CHARS {
            chars.pop();
        }
        chars.push('.');
    }

    chars.into_iter().collect()
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Keyword template used when the generative backend is unavailable.
pub fn fallback_description(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return EMPTY_TITLE_DESCRIPTION.to_owned();
    }

    let lower = title.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));

    if mentions(&["shirt", "tee", "top"]) {
        format!(
            "Comfortable and stylish {title} made from high-quality materials. Perfect for everyday wear with excellent fit and durability."
        )
    } else if mentions(&["phone", "mobile"]) {
        format!(
            "Advanced {title} featuring cutting-edge technology and sleek design. Engineered for performance and reliability."
        )
    } else if mentions(&["headphone", "earphone"]) {
        // Both keywords contain "phone", so the group above always wins.
        format!(
            "Immersive {title} delivering rich, clear sound with all-day comfort. Ideal for music and calls on the go."
        )
    } else if mentions(&["book", "novel", "guide"]) {
        format!("Engaging {title} written to inform and inspire. A rewarding read worth keeping on your shelf.")
    } else if mentions(&["bottle", "cup", "mug"]) {
        format!(
            "Premium {title} crafted for your daily coffee or tea enjoyment. Durable design with comfortable grip and perfect capacity."
        )
    } else if mentions(&["bag", "backpack", "purse"]) {
        format!("Versatile {title} with a durable build and smart storage. Made to carry your essentials in style.")
    } else {
        format!(
            "High-quality {title} crafted with attention to detail. Excellent value offering reliability, style, and functionality for your needs."
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use crate::llm::{DisabledLlmClient, LlmClient, LlmError};

    use super::{
        fallback_description, finalize, sanitize, DescriptionCascade, DescriptionSource,
        MAX_DESCRIPTION_CHARS, MIN_DESCRIPTION_CHARS,
    };

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_owned())
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_owned())
        }
    }

    fn in_bounds(text: &str) -> bool {
        let length = text.chars().count();
        (MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&length)
    }

    #[test]
    fn fallback_for_tshirt_is_bounded_and_terminated() {
        let text = finalize(&fallback_description("Cool T-Shirt"));
        assert!(in_bounds(&text), "{text}");
        assert!(text.ends_with(&['.', '!', '?'][..]));
        assert!(text.starts_with("Comfortable and stylish Cool T-Shirt"));
    }

    #[test]
    fn fallback_templates_follow_keyword_priority() {
        assert!(fallback_description("Smart Phone Case").starts_with("Advanced"));
        assert!(fallback_description("Studio Headphones").starts_with("Advanced"));
        assert!(fallback_description("Wired Earphones").starts_with("Advanced"));
        assert!(fallback_description("Mobile Charger").starts_with("Advanced"));
        assert!(fallback_description("Field Guide").starts_with("Engaging"));
        assert!(fallback_description("Coffee Mug").starts_with("Premium"));
        assert!(fallback_description("Travel Backpack").starts_with("Versatile"));
        assert!(fallback_description("Oak Desk").starts_with("High-quality"));
        assert_eq!(fallback_description("  "), "Quality product available for purchase.");
    }

    #[test]
    fn sanitize_strips_label_and_quotes() {
        assert_eq!(
            sanitize("Description: \"Bright lamp\nfor late nights.\"").as_deref(),
            Some("Bright lamp for late nights.")
        );
        assert_eq!(sanitize("  \"\"  "), None);
    }

    #[test]
    fn short_text_is_padded_and_capitalized() {
        let text = finalize("nice mug");
        assert_eq!(text, "Nice mug. Designed for quality and everyday use.");
    }

    #[test]
    fn long_text_is_cut_at_a_late_sentence_boundary() {
        let first = "a".repeat(159) + ".";
        let text = finalize(&format!("{first} {}", "b".repeat(200)));
        assert_eq!(text.chars().count(), 160);
        assert!(text.ends_with('.'));
    }

    #[test]
    fn long_text_without_late_boundary_gets_an_ellipsis() {
        let text = finalize(&"word ".repeat(80));
        assert_eq!(text.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(text.ends_with("..."));
    }

    #[tokio::test]
    async fn generated_copy_is_finalized() {
        let cascade = DescriptionCascade::new(
            Arc::new(CannedLlm("Description: a sturdy mug for slow mornings")),
            Duration::from_secs(1),
        );
        let result = cascade.describe("Coffee Mug").await;
        assert_eq!(result.source, DescriptionSource::Generated);
        assert_eq!(result.text, "A sturdy mug for slow mornings. Designed for quality and everyday use.");
        assert_eq!(result.length, result.text.chars().count());
    }

    #[tokio::test]
    async fn failures_fall_back_to_templates() {
        let disabled = DescriptionCascade::new(Arc::new(DisabledLlmClient), Duration::from_secs(1));
        assert_eq!(disabled.describe("Cool T-Shirt").await.source, DescriptionSource::Fallback);

        let blank = DescriptionCascade::new(Arc::new(CannedLlm("  ")), Duration::from_secs(1));
        assert_eq!(blank.describe("Cool T-Shirt").await.source, DescriptionSource::Fallback);
    }

    #[tokio::test]
    async fn slow_backend_times_out_into_fallback() {
        let cascade = DescriptionCascade::new(Arc::new(SlowLlm), Duration::from_millis(50));
        let result = cascade.describe("Reading Novel").await;
        assert_eq!(result.source, DescriptionSource::Fallback);
        assert!(result.text.starts_with("Engaging Reading Novel"));
    }

    proptest! {
        #[test]
        fn finalize_always_lands_in_bounds(input in "\\PC{0,400}") {
            let text = finalize(&input);
            prop_assert!(in_bounds(&text), "{} chars: {:?}", text.chars().count(), text);
            prop_assert!(text.ends_with(&['.', '!', '?'][..]));
        }
    }
}
