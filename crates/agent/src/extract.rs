//! Layered pattern extraction of command fields from free text.
//!
//! Every extractor is pure and returns the first non-empty match of an ordered
//! list of patterns.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKey {
    Title,
    Description,
    Status,
    Sku,
    Barcode,
    Handle,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Sku => "sku",
            Self::Barcode => "barcode",
            Self::Handle => "handle",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
}

impl ExtractedFields {
    pub fn from_text(raw: &str) -> Self {
        Self {
            title: extract(raw, FieldKey::Title),
            description: extract(raw, FieldKey::Description),
            status: extract(raw, FieldKey::Status),
            sku: extract(raw, FieldKey::Sku),
            barcode: extract(raw, FieldKey::Barcode),
            product_id: product_id(raw),
            variant_id: variant_id(raw),
        }
    }
}

const QUOTES: &[char] = &['\'', '"'];

const TERMINATORS: [&str; 8] =
    ["and", "with", "description", "title", "status", "handle", "sku", "barcode"];

static TITLE_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("title"));
static DESCRIPTION_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("description"));
static STATUS_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("status"));
static SKU_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("sku"));
static BARCODE_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("barcode"));
static HANDLE_KEY: LazyLock<Regex> = LazyLock::new(|| key_regex("handle"));

static TITLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("title"));
static DESCRIPTION_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("description"));
static STATUS_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("status"));
static SKU_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("sku"));
static BARCODE_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("barcode"));
static HANDLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| quoted_regex("handle"));

static CREATE_PRODUCT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(?:create|add)\s+(?:a\s+|new\s+)?product\s+(.+?)(?:\s+with\b|$)")
});

static PRODUCT_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        compile(r"(?i)product\s+(prod_[a-zA-Z0-9_-]+)"),
        compile(r"(?i)(prod_[a-zA-Z0-9_-]+)"),
        compile(r"(?i)\bid\s+([a-zA-Z0-9_-]+)"),
    ]
});

static VARIANT_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        compile(r"(?i)variant\s+(variant_[a-zA-Z0-9_-]+)"),
        compile(r"(?i)(variant_[a-zA-Z0-9_-]+)"),
        compile(r"(?i)\bid\s+([a-zA-Z0-9_-]+)"),
    ]
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| compile(r#"['"]([^'"]+)['"]"#));

static LOOSE_PRODUCT_NAME: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:delete|remove|find|get)\s+product\s+([^\n\r]+)"));

static STOCK_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        compile(r"(?i)(?:stock|inventory)\s+(?:for|of)\s+([^\n\r]+)"),
        compile(r#"(?i)(?:stock|inventory)\s+['"]([^'"]+)['"]"#),
    ]
});

fn compile(pattern: &str) -> Regex {
    // Patterns are literals in this module and covered by its tests.
    Regex::new(pattern).unwrap_or_else(|error| panic!("invalid extractor pattern: {error}"))
}

fn key_regex(key: &str) -> Regex {
    compile(&format!(r"(?i){key}\s+"))
}

fn quoted_regex(key: &str) -> Regex {
    compile(&format!(r#"(?i){key}\s+['"]([^'"]+)['"]"#))
}

fn patterns(key: FieldKey) -> (&'static Regex, &'static Regex) {
    match key {
        FieldKey::Title => (&*TITLE_KEY, &*TITLE_QUOTED),
        FieldKey::Description => (&*DESCRIPTION_KEY, &*DESCRIPTION_QUOTED),
        FieldKey::Status => (&*STATUS_KEY, &*STATUS_QUOTED),
        FieldKey::Sku => (&*SKU_KEY, &*SKU_QUOTED),
        FieldKey::Barcode => (&*BARCODE_KEY, &*BARCODE_QUOTED),
        FieldKey::Handle => (&*HANDLE_KEY, &*HANDLE_QUOTED),
    }
}

/// Value following `key` in `raw`.
///
/// Tried in order: an unquoted run up to the next field keyword, a comma, a
/// line break or the end; a quoted literal; and for titles only, the text
/// after `create product` / `add product`.
pub fn extract(raw: &str, key: FieldKey) -> Option<String> {
    let (key_pattern, quoted_pattern) = patterns(key);

    key_pattern
        .find_iter(raw)
        .find_map(|found| terminated_value(raw, found.end()))
        .or_else(|| first_capture(quoted_pattern, raw))
        .or_else(|| match key {
            FieldKey::Title => create_product_title(raw),
            _ => None,
        })
}

/// Shortest run starting at `start` that is followed by a field keyword or
/// the end of input. Commas and line breaks end the search without a value.
fn terminated_value(raw: &str, start: usize) -> Option<String> {
    let rest = &raw[start..];
    if rest.chars().next().map_or(true, char::is_whitespace) {
        return None;
    }

    for (offset, ch) in rest.char_indices().skip(1) {
        if is_terminated_at(&rest[offset..]) {
            return clean(&rest[..offset]);
        }
        if matches!(ch, ',' | '\n' | '\r') {
            return None;
        }
    }

    clean(rest)
}

fn is_terminated_at(tail: &str) -> bool {
    if matches!(tail, "\n" | "\r\n" | "\r") {
        return true;
    }

    let after_space = tail.trim_start();
    if after_space.len() == tail.len() {
        return false;
    }

    TERMINATORS.iter().any(|keyword| {
        after_space
            .get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
    })
}

fn create_product_title(raw: &str) -> Option<String> {
    first_capture(&CREATE_PRODUCT_TITLE, raw)
        .filter(|title| !title.to_ascii_lowercase().starts_with("with"))
}

fn first_capture(pattern: &Regex, raw: &str) -> Option<String> {
    pattern.captures(raw).and_then(|captures| captures.get(1)).and_then(|m| clean(m.as_str()))
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let unquoted = trimmed
        .strip_prefix(QUOTES)
        .and_then(|inner| inner.strip_suffix(QUOTES))
        .unwrap_or(trimmed)
        .trim();

    (!unquoted.is_empty()).then(|| unquoted.to_owned())
}

/// `prod_…` token, preferring one introduced by "product", then `id <token>`.
pub fn product_id(raw: &str) -> Option<String> {
    PRODUCT_ID_PATTERNS.iter().find_map(|pattern| first_capture(pattern, raw))
}

/// `variant_…` token, then `id <token>`.
pub fn variant_id(raw: &str) -> Option<String> {
    VARIANT_ID_PATTERNS.iter().find_map(|pattern| first_capture(pattern, raw))
}

/// First single- or double-quoted literal anywhere in the text.
pub fn quoted_value(raw: &str) -> Option<String> {
    first_capture(&QUOTED, raw)
}

/// Name after `delete|remove|find|get product`, unless it is a product id.
pub fn loose_product_name(raw: &str) -> Option<String> {
    first_capture(&LOOSE_PRODUCT_NAME, raw).filter(|name| !name.starts_with("prod_"))
}

pub fn stock_product_name(raw: &str) -> Option<String> {
    STOCK_PATTERNS.iter().find_map(|pattern| first_capture(pattern, raw))
}
