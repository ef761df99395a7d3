use crate::schema::{is_safe_widgets_node, Category, Translated, PROMPT_KEYS, WIDGETS_VALUES};
use crate::translators::Translator;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Any codepoint outside 7-bit ASCII.
pub fn contains_foreign(text: &str) -> bool {
    !text.is_ascii()
}

/// Bare tokens such as `Group_1` or `lora-stack` that other tooling may match on.
pub fn looks_like_identifier(text: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap())
        .is_match(text)
}

/// Rewrites translatable text in a workflow document in place.
///
/// Pass one is the safe sweep: it touches every key and string in the tree
/// but only when the text contains non-ASCII characters, and never looks
/// inside `widgets_values`. Pass two force-translates a fixed set of labelled
/// fields and is the only path into `widgets_values`, gated by
/// [`SAFE_WIDGETS_NODES`](crate::schema::SAFE_WIDGETS_NODES).
pub struct Walker<'a> {
    translator: &'a dyn Translator,
    source: &'a str,
    target: &'a str,
}

impl<'a> Walker<'a> {
    pub fn new(translator: &'a dyn Translator, source: &'a str, target: &'a str) -> Self {
        Self {
            translator,
            source,
            target,
        }
    }

    /// Translate `text`, falling back to the original on error or when the
    /// result only differs by case.
    fn translate_or_keep(&self, text: &str) -> String {
        match self.translator.translate(text, self.source, self.target) {
            Ok(translated) if translated.to_lowercase() != text.to_lowercase() => translated,
            Ok(_) => text.to_string(),
            Err(e) => {
                log::warn!("Keeping original text '{}': {:#}", text, e);
                text.to_string()
            }
        }
    }

    fn replace(&self, text: &mut String, category: Category, on_translated: &mut dyn FnMut(Translated)) {
        let translated = self.translate_or_keep(text);
        if translated != *text {
            let original = std::mem::replace(text, translated.clone());
            on_translated(Translated {
                category,
                original,
                translated,
            });
        }
    }

    fn replace_foreign(&self, text: &mut String, on_translated: &mut dyn FnMut(Translated)) {
        if contains_foreign(text) {
            self.replace(text, Category::Translated, on_translated);
        }
    }

    fn force(&self, slot: Option<&mut Value>, category: Category, on_translated: &mut dyn FnMut(Translated)) {
        if let Some(Value::String(text)) = slot {
            self.replace(text, category, on_translated);
        }
    }

    pub fn pass_one(&self, tree: &mut Value, on_translated: &mut dyn FnMut(Translated)) {
        match tree {
            Value::Object(map) => {
                let mut renames = Vec::new();

                for (key, value) in map.iter_mut() {
                    if key == WIDGETS_VALUES {
                        continue;
                    }
                    if contains_foreign(key) {
                        let new_key = self.translate_or_keep(key);
                        if new_key != *key {
                            renames.push((key.clone(), new_key));
                        }
                    }
                    match value {
                        Value::String(text) => self.replace_foreign(text, on_translated),
                        other => self.pass_one(other, on_translated),
                    }
                }

                if !renames.is_empty() {
                    apply_renames(map, renames);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    match item {
                        Value::String(text) => self.replace_foreign(text, on_translated),
                        other => self.pass_one(other, on_translated),
                    }
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    /// Runs the group and node rules on the document's top-level `groups` and
    /// `nodes`. Either may be absent.
    pub fn pass_two(&self, document: &mut Value, on_translated: &mut dyn FnMut(Translated)) {
        if let Some(Value::Array(groups)) = document.get_mut("groups") {
            self.translate_groups(groups, on_translated);
        }
        if let Some(Value::Array(nodes)) = document.get_mut("nodes") {
            self.translate_nodes(nodes, on_translated);
        }
    }

    pub fn translate_groups(&self, groups: &mut [Value], on_translated: &mut dyn FnMut(Translated)) {
        for group in groups.iter_mut() {
            if let Some(Value::String(title)) = group.get_mut("title") {
                if !looks_like_identifier(title) {
                    self.replace(title, Category::GroupTitle, on_translated);
                }
            }
        }
    }

    pub fn translate_nodes(&self, nodes: &mut [Value], on_translated: &mut dyn FnMut(Translated)) {
        for node in nodes.iter_mut() {
            let Some(node) = node.as_object_mut() else {
                continue;
            };

            self.force(node.get_mut("title"), Category::NodeTitle, on_translated);
            self.force(node.get_mut("notes"), Category::Notes, on_translated);

            if let Some(Value::Object(parameters)) = node.get_mut("parameters") {
                for &key in PROMPT_KEYS {
                    self.force(parameters.get_mut(key), Category::Prompt(key), on_translated);
                }
            }

            if let Some(Value::Array(widgets)) = node.get_mut("widgets") {
                for widget in widgets.iter_mut() {
                    if let Value::Object(widget) = widget {
                        self.force(widget.get_mut("label"), Category::WidgetLabel, on_translated);
                        self.force(widget.get_mut("default"), Category::WidgetDefault, on_translated);
                    }
                }
            }

            let safe = node
                .get("type")
                .and_then(Value::as_str)
                .map_or(false, is_safe_widgets_node);
            if !safe {
                continue;
            }
            if let Some(Value::Array(values)) = node.get_mut(WIDGETS_VALUES) {
                for value in values.iter_mut() {
                    if let Value::String(text) = value {
                        self.replace(text, Category::WidgetsValue, on_translated);
                    }
                }
            }
        }
    }
}

/// Applies staged key renames, keeping each renamed entry at its original
/// position. A renamed entry replaces an existing entry with the same name.
fn apply_renames(map: &mut Map<String, Value>, renames: Vec<(String, String)>) {
    for (old, new) in &renames {
        log::info!("Renamed key: {} ➔ {}", old, new);
    }

    let renames: HashMap<String, String> = renames.into_iter().collect();
    let targets: HashSet<&String> = renames.values().collect();

    let entries = std::mem::take(map);
    for (key, value) in entries {
        match renames.get(&key) {
            Some(new_key) => {
                map.insert(new_key.clone(), value);
            }
            None if targets.contains(&key) => {}
            None => {
                map.insert(key, value);
            }
        }
    }
}
