pub mod feedback;
pub mod script;
pub mod session;
pub mod simplify;
pub mod translator;

pub use feedback::{FeedbackError, FeedbackLabel, FeedbackRecord, FeedbackSink, FeedbackSummary};
pub use script::{detect_script, Script, ScriptGuard};
pub use session::{Session, SessionController, SessionError, SimplifyOutcome};
pub use simplify::{RuleError, SimplificationRule, Simplifier};
pub use translator::Translator;
