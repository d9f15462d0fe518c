pub mod mock;
pub mod openai;

pub use openai::OpenAiProvider;
