use std::fmt;

/// Node types whose `widgets_values` hold display text only, never
/// positional machine-parsed settings.
pub const SAFE_WIDGETS_NODES: &[&str] = &[
    "Note",
    "MarkdownNote",
    "PrimitiveString",
    "String Literal",
    "CLIPTextEncode",
];

/// Prompt-like subfields of a node's `parameters` mapping.
pub const PROMPT_KEYS: &[&str] = &["prompt", "positive_prompt", "negative_prompt"];

/// Language codes offered by the CLI. `auto` is only valid as a source.
pub const LANGUAGES: &[&str] = &[
    "auto", "en", "zh-CN", "ja", "ko", "de", "fr", "es", "ru", "it", "pt", "ar", "hi", "tr",
    "nl", "pl", "sv", "fi", "uk", "vi",
];

pub const AUTO_DETECT: &str = "auto";

pub const WIDGETS_VALUES: &str = "widgets_values";

pub fn is_safe_widgets_node(node_type: &str) -> bool {
    SAFE_WIDGETS_NODES.contains(&node_type)
}

pub fn is_known_language(code: &str) -> bool {
    LANGUAGES.contains(&code)
}

/// Which rule produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Translated,
    GroupTitle,
    NodeTitle,
    Notes,
    Prompt(&'static str),
    WidgetLabel,
    WidgetDefault,
    WidgetsValue,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Translated => write!(f, "Translated"),
            Category::GroupTitle => write!(f, "Group Title (force)"),
            Category::NodeTitle => write!(f, "Node Title (force)"),
            Category::Notes => write!(f, "Notes (force)"),
            Category::Prompt(key) => write!(f, "Prompt ({}) (force)", key),
            Category::WidgetLabel => write!(f, "Widget Label (force)"),
            Category::WidgetDefault => write!(f, "Widget Default (force)"),
            Category::WidgetsValue => write!(f, "Widgets Value (force)"),
        }
    }
}

/// A single replacement made by the walker, reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub category: Category,
    pub original: String,
    pub translated: String,
}

impl fmt::Display for Translated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ➔ {}", self.category, self.original, self.translated)
    }
}
