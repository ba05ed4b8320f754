//! Prompt domain
//!
//! The fixed instructions sent ahead of every user prompt.

mod template;

pub use template::PromptTemplate;
