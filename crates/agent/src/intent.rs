use serde::Serialize;

/// One inbound chat message. `normalized_text` is what keyword tests run against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub raw_text: String,
    pub normalized_text: String,
}

impl Command {
    pub fn new(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = normalize(&raw_text);
        Self { raw_text, normalized_text }
    }
}

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateProduct,
    ReadProduct,
    UpdateProduct,
    DeleteProduct,
    VariantCreate,
    VariantRead,
    VariantUpdate,
    VariantDelete,
    StockQuery,
    Help,
    Status,
    /// A variant message without a recognizable operation.
    Unknown,
}

/// Keyword classifier over normalized text. The first matching rule wins.
pub fn classify(normalized: &str) -> Intent {
    let has = |keywords: &[&str]| keywords.iter().any(|keyword| normalized.contains(keyword));

    if has(&["variant"]) {
        return if has(&["create", "add"]) {
            Intent::VariantCreate
        } else if has(&["show", "list", "get"]) {
            Intent::VariantRead
        } else if has(&["update", "modify", "edit"]) {
            Intent::VariantUpdate
        } else if has(&["delete", "remove"]) {
            Intent::VariantDelete
        } else {
            Intent::Unknown
        };
    }

    if has(&["stock", "inventory"]) {
        Intent::StockQuery
    } else if has(&["create", "add"]) {
        Intent::CreateProduct
    } else if has(&["show", "get", "find", "list"]) {
        Intent::ReadProduct
    } else if has(&["update", "modify", "change", "edit"]) {
        Intent::UpdateProduct
    } else if has(&["delete", "remove"]) {
        Intent::DeleteProduct
    } else if has(&["help", "commands"]) {
        Intent::Help
    } else if has(&["count", "total", "status"]) {
        Intent::Status
    } else {
        Intent::Help
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Command, Intent};

    struct Case {
        text: &'static str,
        expected: Intent,
    }

    #[test]
    fn classification_follows_keyword_priority() {
        let cases = [
            Case { text: "delete variant variant_ab12", expected: Intent::VariantDelete },
            Case { text: "add variant for product prod_1", expected: Intent::VariantCreate },
            Case { text: "show variants for product prod_1", expected: Intent::VariantRead },
            Case { text: "edit variant variant_1 with sku x", expected: Intent::VariantUpdate },
            Case { text: "variant please", expected: Intent::Unknown },
            Case { text: "check stock for cool t-shirt", expected: Intent::StockQuery },
            Case { text: "add inventory", expected: Intent::StockQuery },
            Case { text: "create product with title mug", expected: Intent::CreateProduct },
            Case { text: "list all products", expected: Intent::ReadProduct },
            Case { text: "change product prod_1 status draft", expected: Intent::UpdateProduct },
            Case { text: "remove product prod_1", expected: Intent::DeleteProduct },
            Case { text: "what commands exist", expected: Intent::Help },
            Case { text: "total", expected: Intent::Status },
            Case { text: "hello there", expected: Intent::Help },
        ];

        for case in cases {
            assert_eq!(classify(case.text), case.expected, "{}", case.text);
        }
    }

    #[test]
    fn substring_matching_is_not_word_bound() {
        // "address" carries "add".
        assert_eq!(classify("my address"), Intent::CreateProduct);
        // "status" reaches the status rule only when nothing earlier matches.
        assert_eq!(classify("update status"), Intent::UpdateProduct);
    }

    #[test]
    fn command_normalizes_case_and_edges() {
        let command = Command::new("  Delete VARIANT variant_X \n");
        assert_eq!(command.normalized_text, "delete variant variant_x");
        assert_eq!(command.raw_text, "  Delete VARIANT variant_X \n");
        assert_eq!(classify(&command.normalized_text), Intent::VariantDelete);
    }
}
