//! Settings meld-in and command-surface declarations (spec.md §4.7).

use std::collections::HashMap;

use crate::error::SettingsIssue;

/// A single field in a plugin's settings struct: its current value and
/// whether that value was set explicitly in memory (by construction or a
/// prior `set` command) versus still holding its default.
#[derive(Debug, Clone)]
struct Field {
    value: String,
    explicit: bool,
}

/// A plugin's settings, melded against a config file section using the
/// "aggressive meld" rule: unset fields are filled from the file;
/// explicitly-set in-memory fields are preserved (spec.md §4.7).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    fields: HashMap<String, Field>,
    required: Vec<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with its default value. Required fields that stay
    /// absent from both the in-memory defaults and the file are reported
    /// as `Missing`.
    pub fn declare(&mut self, key: impl Into<String>, default: impl Into<String>, required: bool) {
        let key = key.into();
        if required {
            self.required.push(key.clone());
        }
        self.fields.insert(
            key,
            Field {
                value: default.into(),
                explicit: false,
            },
        );
    }

    /// Marks a field as explicitly set (e.g. via `set_setting_by_name`),
    /// so a subsequent meld will not overwrite it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.fields.get_mut(key) {
            Some(field) => {
                field.value = value.into();
                field.explicit = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.value.as_str())
    }

    /// Melds a config file's `[section]` into this settings struct,
    /// collecting missing/invalid issues rather than failing outright
    /// (spec.md §4.7, §7).
    pub fn meld(&mut self, section: &HashMap<String, String>) -> Vec<SettingsIssue> {
        let mut issues = Vec::new();

        for (key, value) in section {
            match self.fields.get_mut(key) {
                Some(field) if !field.explicit => {
                    field.value = value.clone();
                }
                Some(_) => { /* explicit in-memory value wins, per aggressive meld */ }
                None => issues.push(SettingsIssue::Invalid {
                    key: key.clone(),
                    value: value.clone(),
                }),
            }
        }

        for key in &self.required {
            if !section.contains_key(key) && !self.fields.get(key).map_or(false, |f| f.explicit) {
                issues.push(SettingsIssue::Missing { key: key.clone() });
            }
        }

        issues
    }

    pub fn serialise(&self) -> HashMap<String, String> {
        self.fields
            .iter()
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect()
    }
}

/// One entry in a plugin's command surface (spec.md §6).
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub trigger: String,
    pub description: String,
    /// May contain the `$command`/`$nickname` syntax placeholders.
    pub syntax: String,
}
