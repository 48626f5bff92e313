mod diagnosis;
mod template;

pub use diagnosis::{DiagnosisPrompt, DIAGNOSIS_TEMPLATE};
pub use template::PromptTemplate;
