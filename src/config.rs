//! Screen layer configuration
use std::env;
use std::fs::File;

use serde_yaml::{self, Value};

use crate::error::{ErrorCode, RuntimeError};

/// String value for boolean `true` config settings
pub const CONFIG_TRUE_VALUE: &str = "true";
/// String value for boolean `false` config settings
pub const CONFIG_FALSE_VALUE: &str = "false";

/// Expand a leading `$(HOME)` in a config value.
pub fn expand_home(value: &str) -> String {
    match value.strip_prefix("$(HOME)") {
        Some(rest) => match env::var("HOME") {
            Ok(home) => format!("{}{}", home, rest),
            Err(_) => value.to_string(),
        },
        None => value.to_string(),
    }
}

/// Interpret a config value for a boolean key: an absent or empty value and
/// the true literal all mean "set".
pub fn boolean_value_set(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.is_empty() || v == CONFIG_TRUE_VALUE,
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    left_margin: i32,
    right_margin: i32,
    disable_hyphenation: bool,
    disable_color: bool,
    use_xterm_title: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            left_margin: 0,
            right_margin: 0,
            disable_hyphenation: false,
            disable_color: false,
            use_xterm_title: false,
        }
    }
}

impl Config {
    pub fn new(
        left_margin: i32,
        right_margin: i32,
        disable_hyphenation: bool,
        disable_color: bool,
    ) -> Config {
        Config {
            left_margin: left_margin.max(0),
            right_margin: right_margin.max(0),
            disable_hyphenation,
            disable_color,
            use_xterm_title: false,
        }
    }

    pub fn from_file(file: File) -> Result<Config, RuntimeError> {
        match serde_yaml::from_reader::<File, Value>(file) {
            Ok(data) => {
                let left_margin = match data["left-margin"].as_u64() {
                    Some(v) => v as i32,
                    None => 0,
                };
                let right_margin = match data["right-margin"].as_u64() {
                    Some(v) => v as i32,
                    None => 0,
                };
                let disable_hyphenation = match data["disable-hyphenation"].as_bool() {
                    Some(v) => v,
                    None => false,
                };
                let disable_color = match data["disable-color"].as_bool() {
                    Some(v) => v,
                    None => false,
                };
                let use_xterm_title = match data["use-xterm-title"].as_bool() {
                    Some(v) => v,
                    None => false,
                };

                Ok(Config {
                    left_margin,
                    right_margin,
                    disable_hyphenation,
                    disable_color,
                    use_xterm_title,
                })
            }
            Err(e) => Err(RuntimeError::recoverable(
                ErrorCode::ConfigError,
                format!("{}", e),
            )),
        }
    }

    pub fn left_margin(&self) -> i32 {
        self.left_margin
    }

    pub fn right_margin(&self) -> i32 {
        self.right_margin
    }

    pub fn disable_hyphenation(&self) -> bool {
        self.disable_hyphenation
    }

    pub fn disable_color(&self) -> bool {
        self.disable_color
    }

    pub fn use_xterm_title(&self) -> bool {
        self.use_xterm_title
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, Write};

    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.left_margin(), 0);
        assert_eq!(config.right_margin(), 0);
        assert!(!config.disable_hyphenation());
        assert!(!config.disable_color());
        assert!(!config.use_xterm_title());
    }

    #[test]
    fn test_new_clamps_margins() {
        let config = Config::new(-5, 3, true, false);
        assert_eq!(config.left_margin(), 0);
        assert_eq!(config.right_margin(), 3);
        assert!(config.disable_hyphenation());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::tempfile().expect("Error creating tempfile");
        writeln!(file, "left-margin: 2").expect("Error writing tempfile");
        writeln!(file, "right-margin: 1").expect("Error writing tempfile");
        writeln!(file, "disable-hyphenation: true").expect("Error writing tempfile");
        file.rewind().expect("Error rewinding tempfile");

        let config = Config::from_file(file).expect("Error reading config");
        assert_eq!(config.left_margin(), 2);
        assert_eq!(config.right_margin(), 1);
        assert!(config.disable_hyphenation());
        assert!(!config.disable_color());
    }

    #[test]
    fn test_from_file_defaults() {
        let mut file = tempfile::tempfile().expect("Error creating tempfile");
        writeln!(file, "unrelated: value").expect("Error writing tempfile");
        file.rewind().expect("Error rewinding tempfile");

        let config = Config::from_file(file).expect("Error reading config");
        assert_eq!(config.left_margin(), 0);
        assert_eq!(config.right_margin(), 0);
    }

    #[test]
    fn test_expand_home() {
        let home = std::env::var("HOME").expect("HOME not set");
        assert_eq!(
            expand_home("$(HOME)/stories"),
            format!("{}/stories", home)
        );
        assert_eq!(expand_home("/tmp/stories"), "/tmp/stories");
    }

    #[test]
    fn test_boolean_value_set() {
        assert!(boolean_value_set(None));
        assert!(boolean_value_set(Some("")));
        assert!(boolean_value_set(Some("true")));
        assert!(!boolean_value_set(Some("false")));
        assert!(!boolean_value_set(Some("bogus")));
    }
}
