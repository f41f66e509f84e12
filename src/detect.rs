//! Error detection over raw log chunks.
//!
//! A chunk is considered an error signal if it contains the token
//! "error" in any letter case. Each chunk is evaluated on its own;
//! there is no severity parsing and no multi-line correlation.

const ERROR_TOKEN: &str = "error";

/// Returns true if the chunk of log text carries an error signal.
pub fn is_error(text: &str) -> bool {
    text.to_lowercase().contains(ERROR_TOKEN)
}
