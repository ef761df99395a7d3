use crate::schema::Translated;
use crate::translators::Translator;
use crate::walker::Walker;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub pass_one: usize,
    pub pass_two: Option<usize>,
    pub interrupted: bool,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.pass_one + self.pass_two.unwrap_or(0)
    }
}

pub struct Engine {
    translator: Box<dyn Translator>,
    source: String,
    target: String,
    deep_scan: bool,
}

impl Engine {
    pub fn new(translator: Box<dyn Translator>, source: String, target: String, deep_scan: bool) -> Self {
        Self {
            translator,
            source,
            target,
            deep_scan,
        }
    }

    /// Runs pass one and, when deep scan is enabled, pass two. `interrupted`
    /// is only checked between passes.
    pub fn run(
        &self,
        document: &mut Value,
        interrupted: &AtomicBool,
        on_translated: &mut dyn FnMut(Translated),
    ) -> Summary {
        let walker = Walker::new(self.translator.as_ref(), &self.source, &self.target);
        let mut summary = Summary::default();

        log::info!("Starting pass 1 (non-ASCII only, safe mode): {} -> {}", self.source, self.target);
        walker.pass_one(document, &mut |translated| {
            summary.pass_one += 1;
            on_translated(translated);
        });
        log::info!("Pass 1 translated {} strings", summary.pass_one);

        if interrupted.load(Ordering::SeqCst) {
            summary.interrupted = true;
            return summary;
        }
        if !self.deep_scan {
            return summary;
        }

        log::info!("Starting pass 2 (deep text scan)");
        let mut count = 0;
        walker.pass_two(document, &mut |translated| {
            count += 1;
            on_translated(translated);
        });
        log::info!("Pass 2 translated {} strings", count);

        summary.pass_two = Some(count);
        summary.interrupted = interrupted.load(Ordering::SeqCst);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translators::GlossaryTranslator;
    use serde_json::json;
    use std::collections::HashMap;

    fn engine(deep_scan: bool) -> Engine {
        let glossary = GlossaryTranslator::new(HashMap::from([
            ("Bonjour".to_string(), "Hello".to_string()),
            ("猫".to_string(), "cat".to_string()),
        ]));
        Engine::new(Box::new(glossary), "auto".to_string(), "en".to_string(), deep_scan)
    }

    fn document() -> Value {
        json!({"nodes": [{"type": "Note", "title": "Bonjour", "widgets_values": ["猫"], "notes": "猫"}]})
    }

    #[test]
    fn test_runs_both_passes() {
        let mut doc = document();
        let mut lines = Vec::new();

        let summary = engine(true).run(&mut doc, &AtomicBool::new(false), &mut |t| lines.push(t.to_string()));

        assert_eq!(summary.pass_one, 1);
        assert_eq!(summary.pass_two, Some(2));
        assert_eq!(summary.total(), 3);
        assert!(!summary.interrupted);
        assert_eq!(
            lines,
            vec![
                "Translated: 猫 ➔ cat",
                "Node Title (force): Bonjour ➔ Hello",
                "Widgets Value (force): 猫 ➔ cat",
            ]
        );
        assert_eq!(doc["nodes"][0]["notes"], "cat");
    }

    #[test]
    fn test_deep_scan_disabled_skips_pass_two() {
        let mut doc = document();

        let summary = engine(false).run(&mut doc, &AtomicBool::new(false), &mut |_| {});

        assert_eq!(summary.pass_two, None);
        assert_eq!(doc["nodes"][0]["title"], "Bonjour");
        assert_eq!(doc["nodes"][0]["widgets_values"][0], "猫");
    }

    #[test]
    fn test_interrupt_stops_at_pass_boundary() {
        let mut doc = document();

        let summary = engine(true).run(&mut doc, &AtomicBool::new(true), &mut |_| {});

        assert!(summary.interrupted);
        assert_eq!(summary.pass_one, 1);
        assert_eq!(summary.pass_two, None);
        assert_eq!(doc["nodes"][0]["title"], "Bonjour");
    }
}
