//! Timeline synthesis: prompt construction, lenient response parsing, and
//! the deterministic fallback used when the model reply is unusable.

mod fallback;
mod parser;
mod prompt;
mod synthesizer;

pub use synthesizer::TimelineSynthesizer;

use thiserror::Error;

/// Internal to synthesis: every variant is recovered by falling back to the
/// deterministic timeline, so it never crosses the module boundary.
#[derive(Debug, Error)]
enum SynthesisError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(String),
}
