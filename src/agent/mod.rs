pub mod events;
pub mod llm;
pub mod r#loop;
pub mod prompt;
pub mod state;
pub mod tool;
pub mod types;
