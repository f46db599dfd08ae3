pub mod huggingface;
pub mod openai;

pub use huggingface::HuggingFaceClient;
pub use openai::OpenAiClient;
