//! Action descriptors bound to expressions and their execution boundary.
//!
//! Actions persist as `{ "type": "press" | "hotkey" | "write", "value": "..." }`
//! where a hotkey value lists its keys comma separated, modifiers first.

use crate::{constants::WRITE_INTERVAL_MS, Error, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What happens when an expression fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Tap a single named key
    Press(String),
    /// Hold keys in order, then release them in reverse
    Hotkey(#[serde(with = "comma_list")] Vec<String>),
    /// Type literal text
    Write(String),
}

impl Action {
    /// Parse a hotkey string such as `"ctrl, shift, t"`
    #[must_use]
    pub fn hotkey(keys: &str) -> Self {
        Self::Hotkey(comma_list::split(keys))
    }

    /// Reject descriptors that could not do anything
    ///
    /// # Errors
    ///
    /// Returns an error for an empty key, key list or text.
    pub fn validate(&self) -> Result<()> {
        let empty = match self {
            Self::Press(key) => key.trim().is_empty(),
            Self::Hotkey(keys) => keys.is_empty(),
            Self::Write(text) => text.is_empty(),
        };
        if empty {
            return Err(Error::ConfigError(format!("Action has no value: {self}")));
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Press(key) => write!(f, "Press: {key}"),
            Self::Hotkey(keys) => write!(f, "Hotkey: {}", keys.join("+")),
            Self::Write(text) => write!(f, "Write: {text}"),
        }
    }
}

mod comma_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn split(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn serialize<S: Serializer>(keys: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&keys.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(split(&value))
    }
}

/// Something that can synthesize keyboard input
pub trait InputInjector {
    /// Tap one key
    fn press(&mut self, key: &str) -> Result<()>;

    /// Press `keys` in order and release them in reverse order
    fn hotkey(&mut self, keys: &[String]) -> Result<()>;

    /// Type `text`, pausing `interval` between characters
    fn write(&mut self, text: &str, interval: Duration) -> Result<()>;
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn press(&mut self, key: &str) -> Result<()> {
        (**self).press(key)
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        (**self).hotkey(keys)
    }

    fn write(&mut self, text: &str, interval: Duration) -> Result<()> {
        (**self).write(text, interval)
    }
}

/// Run `action` through `injector`
///
/// # Errors
///
/// Propagates the injector's failure.
pub fn execute_action(injector: &mut dyn InputInjector, action: &Action) -> Result<()> {
    match action {
        Action::Press(key) => injector.press(key),
        Action::Hotkey(keys) => injector.hotkey(keys),
        Action::Write(text) => injector.write(text, Duration::from_millis(WRITE_INTERVAL_MS)),
    }
}

/// Injector that only logs and records what it was asked to do
#[derive(Debug, Default)]
pub struct LogInjector {
    executed: Vec<Action>,
}

impl LogInjector {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions received so far
    #[must_use]
    pub fn executed(&self) -> &[Action] {
        &self.executed
    }
}

impl InputInjector for LogInjector {
    fn press(&mut self, key: &str) -> Result<()> {
        info!("[dry-run] press {key}");
        self.executed.push(Action::Press(key.to_string()));
        Ok(())
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        info!("[dry-run] hotkey {}", keys.join("+"));
        self.executed.push(Action::Hotkey(keys.to_vec()));
        Ok(())
    }

    fn write(&mut self, text: &str, _interval: Duration) -> Result<()> {
        info!("[dry-run] write {text:?}");
        self.executed.push(Action::Write(text.to_string()));
        Ok(())
    }
}
