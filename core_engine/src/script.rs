use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Tamil,
    Devanagari,
    Han,
    Other,
}

const ALL_SCRIPTS: [Script; 5] = [
    Script::Latin,
    Script::Tamil,
    Script::Devanagari,
    Script::Han,
    Script::Other,
];

impl Script {
    pub fn of(ch: char) -> Option<Self> {
        match ch {
            '\u{0B80}'..='\u{0BFF}' => Some(Script::Tamil),
            '\u{0900}'..='\u{097F}' => Some(Script::Devanagari),
            '\u{4E00}'..='\u{9FFF}' => Some(Script::Han),
            c if c.is_ascii_alphabetic() => Some(Script::Latin),
            '\u{00C0}'..='\u{024F}' if ch.is_alphabetic() => Some(Script::Latin),
            c if c.is_alphabetic() => Some(Script::Other),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            Script::Latin => 0,
            Script::Tamil => 1,
            Script::Devanagari => 2,
            Script::Han => 3,
            Script::Other => 4,
        }
    }
}

/// Returns the script with the most letters in `text`, or `None` when the text
/// contains no letters at all. Ties go to the script listed first in [`Script`].
pub fn detect_script(text: &str) -> Option<Script> {
    let mut counts = [0usize; ALL_SCRIPTS.len()];
    for script in text.chars().filter_map(Script::of) {
        counts[script.slot()] += 1;
    }

    let mut best: Option<(Script, usize)> = None;
    for script in ALL_SCRIPTS {
        let count = counts[script.slot()];
        if count == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((script, count));
        }
    }
    best.map(|(script, _)| script)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptGuard {
    expected: Option<Script>,
}

impl ScriptGuard {
    pub fn disabled() -> Self {
        Self { expected: None }
    }

    pub fn expecting(script: Script) -> Self {
        Self {
            expected: Some(script),
        }
    }

    pub fn mismatch(&self, text: &str) -> Option<(Script, Script)> {
        let expected = self.expected?;
        match detect_script(text) {
            Some(detected) if detected != expected => Some((expected, detected)),
            _ => None,
        }
    }
}
