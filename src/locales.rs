//! Localised strings used by the screen layer.
//!
//! The interpreter session may replace the catalogue wholesale when a
//! translation is available; the defaults are English.

#[derive(Clone, Debug)]
pub struct Locale {
    /// Pager prompt, displayed bracketed as `[MORE]`
    pub more_prompt: String,
    /// Status line score label
    pub score: String,
    /// Status line turns label
    pub turns: String,
    /// Prompt shown before the interface shuts down
    pub press_any_key_to_quit: String,
    /// Diagnostic used when a screen function aborts the session
    pub function_call_aborted: String,
    /// Version banner, `{}` replaced with the crate version
    pub version_banner: String,
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            more_prompt: "MORE".to_string(),
            score: "Score".to_string(),
            turns: "Turns".to_string(),
            press_any_key_to_quit: "Press any key to quit".to_string(),
            function_call_aborted: "Function call \"{}\" aborted due to error".to_string(),
            version_banner: "zscreen interface version {}".to_string(),
        }
    }
}

impl Locale {
    /// The `function_call_aborted` diagnostic with the function name filled in.
    pub fn aborted_message(&self, function: &str) -> String {
        self.function_call_aborted.replacen("{}", function, 1)
    }

    /// The version banner with the crate version filled in.
    pub fn version_message(&self) -> String {
        self.version_banner
            .replacen("{}", env!("CARGO_PKG_VERSION"), 1)
    }
}
