use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplificationRule {
    pub pattern: String,
    pub replacement: String,
}

impl SimplificationRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("simplification rule #{index} has an empty pattern")]
    EmptyPattern { index: usize },
}

#[derive(Debug, Clone)]
pub struct Simplifier {
    rules: Vec<SimplificationRule>,
}

impl Simplifier {
    pub fn new(rules: Vec<SimplificationRule>) -> Result<Self, RuleError> {
        if let Some(index) = rules.iter().position(|rule| rule.pattern.is_empty()) {
            return Err(RuleError::EmptyPattern { index });
        }
        Ok(Self { rules })
    }

    pub fn with_default_rules() -> Self {
        Self {
            rules: Self::default_rules(),
        }
    }

    pub fn default_rules() -> Vec<SimplificationRule> {
        // Formal passive/causative forms mapped to plain verbs.
        let seed: &[(&str, &str)] = &[
            ("செயல்படுத்தப்படுகிறது", "செய்கிறது"),
            ("மாற்றத்தை ஏற்படுத்துகிறது", "மாற்றுகிறது"),
            ("நடந்து கொள்ள மாட்டாள்", "நல்லபடியாக நடக்க மாட்டாள்"),
        ];
        seed.iter()
            .map(|(pattern, replacement)| SimplificationRule::new(*pattern, *replacement))
            .collect()
    }

    pub fn rules(&self) -> &[SimplificationRule] {
        &self.rules
    }

    pub fn simplify(&self, text: &str) -> String {
        let mut output = text.to_string();
        for rule in &self.rules {
            if output.contains(&rule.pattern) {
                output = output.replace(&rule.pattern, &rule.replacement);
            }
        }
        output
    }

    pub fn is_stable(&self, text: &str) -> bool {
        !self.rules.iter().any(|rule| text.contains(&rule.pattern))
    }
}
