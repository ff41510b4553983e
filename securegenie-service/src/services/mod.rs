pub mod operation;
pub mod prompt;
pub mod providers;

pub use operation::{Operation, OperationSpec};
pub use prompt::{Prompt, PromptTemplate};
