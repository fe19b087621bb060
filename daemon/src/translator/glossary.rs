use std::collections::HashMap;

use adaptive_tamil_core::Translator;
use anyhow::Result;
use async_trait::async_trait;

pub struct GlossaryTranslator {
    phrases: HashMap<&'static str, &'static str>,
    words: HashMap<&'static str, &'static str>,
}

impl GlossaryTranslator {
    pub fn new() -> Self {
        let phrases = HashMap::from([
            ("hello", "வணக்கம்"),
            ("good morning", "காலை வணக்கம்"),
            ("good night", "இனிய இரவு"),
            ("thank you", "நன்றி"),
            ("how are you", "எப்படி இருக்கிறீர்கள்"),
            ("the plan is implemented", "திட்டம் செயல்படுத்தப்படுகிறது"),
            ("education transforms society", "கல்வி சமூகத்தில் மாற்றத்தை ஏற்படுத்துகிறது"),
            ("she will not behave", "அவள் நடந்து கொள்ள மாட்டாள்"),
        ]);
        let words = HashMap::from([
            ("i", "நான்"),
            ("you", "நீங்கள்"),
            ("we", "நாங்கள்"),
            ("she", "அவள்"),
            ("he", "அவன்"),
            ("water", "தண்ணீர்"),
            ("food", "உணவு"),
            ("school", "பள்ளி"),
            ("book", "புத்தகம்"),
            ("city", "நகரம்"),
            ("house", "வீடு"),
            ("friend", "நண்பன்"),
            ("mother", "அம்மா"),
            ("father", "அப்பா"),
            ("teacher", "ஆசிரியர்"),
            ("good", "நல்ல"),
            ("today", "இன்று"),
            ("tomorrow", "நாளை"),
            ("plan", "திட்டம்"),
            ("implemented", "செயல்படுத்தப்படுகிறது"),
            ("education", "கல்வி"),
            ("society", "சமூகம்"),
            ("transforms", "மாற்றத்தை ஏற்படுத்துகிறது"),
            ("yes", "ஆம்"),
            ("no", "இல்லை"),
        ]);

        Self { phrases, words }
    }

    fn translate_words(&self, text: &str) -> String {
        let mut output = Vec::new();
        for token in text.split_whitespace() {
            let start = token
                .find(|ch: char| ch.is_alphanumeric())
                .unwrap_or(token.len());
            let end = token
                .rfind(|ch: char| ch.is_alphanumeric())
                .map(|index| index + token[index..].chars().next().map_or(1, char::len_utf8))
                .unwrap_or(start)
                .max(start);
            let (lead, rest) = token.split_at(start);
            let (word, trail) = rest.split_at(end - start);

            let translated = self
                .words
                .get(word.to_lowercase().as_str())
                .copied()
                .unwrap_or(word);
            output.push(format!("{lead}{translated}{trail}"));
        }
        output.join(" ")
    }
}

fn phrase_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|ch: char| matches!(ch, '.' | '!' | '?' | ','))
        .to_lowercase()
}

#[async_trait]
impl Translator for GlossaryTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        if let Some(phrase) = self.phrases.get(phrase_key(text).as_str()) {
            return Ok((*phrase).to_string());
        }
        Ok(self.translate_words(text))
    }
}
