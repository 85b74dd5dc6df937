//! Named options declared by plugins.
//!
//! During `on_init` each plugin declares its options through an
//! [`OptionScope`], which forces every name to start with the plugin's own
//! prefix (`summary_info` for the `summary` plugin) so plugins cannot collide
//! with each other or with the built-in options.  Callers turn raw
//! `NAME[=VALUE]` strings into [`PluginOptions`] with
//! [`OptionRegistry::parse`]; plugins read them back in `on_file_init`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionError {
    #[error("Option '{name}' declared by plugin '{plugin}' must start with '{plugin}_'")]
    Unprefixed { plugin: String, name: String },
    #[error("Option '{0}' is already declared")]
    Duplicate(String),
    #[error("Unknown option '{0}'")]
    Unknown(String),
    #[error("Option '{name}': {reason}")]
    BadValue { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// Present or absent; takes no value.
    Flag,
    /// Takes `true` / `false`.
    Bool,
    /// Takes an arbitrary string.
    Str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSpec {
    pub name:    String,
    pub owner:   String,
    pub kind:    OptionKind,
    pub metavar: Option<String>,
    pub help:    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

/// Option values for one load, keyed by full option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginOptions(BTreeMap<String, OptionValue>);

impl PluginOptions {
    pub fn set(&mut self, name: impl Into<String>, value: OptionValue) {
        self.0.insert(name.into(), value);
    }

    /// True when a flag was given or a bool option was set to true.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(OptionValue::Bool(true)))
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(OptionValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Default)]
pub struct OptionRegistry {
    specs: Vec<OptionSpec>,
}

impl OptionRegistry {
    pub fn new() -> Self { Self::default() }

    /// Declaration handle for plugin `plugin`.
    pub fn scope<'a>(&'a mut self, plugin: &'a str) -> OptionScope<'a> {
        OptionScope { registry: self, plugin }
    }

    pub fn specs(&self) -> &[OptionSpec] { &self.specs }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Parse `NAME` or `NAME=VALUE` against the declared options.
    pub fn parse(&self, raw: &str) -> Result<(String, OptionValue), OptionError> {
        let (name, value) = match raw.split_once('=') {
            Some((n, v)) => (n.trim(), Some(v)),
            None         => (raw.trim(), None),
        };
        let spec = self.get(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let bad = |reason: &str| OptionError::BadValue { name: name.to_string(), reason: reason.to_string() };

        let value = match (spec.kind, value) {
            (OptionKind::Flag, None) => OptionValue::Bool(true),
            (OptionKind::Flag, Some(_)) => return Err(bad("flag takes no value")),
            (OptionKind::Bool, None) => OptionValue::Bool(true),
            (OptionKind::Bool, Some(v)) => match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on"  => OptionValue::Bool(true),
                "false" | "no" | "0" | "off" => OptionValue::Bool(false),
                _ => return Err(bad("expected true or false")),
            },
            (OptionKind::Str, Some(v)) => OptionValue::Str(v.to_string()),
            (OptionKind::Str, None) => return Err(bad("value required")),
        };
        Ok((name.to_string(), value))
    }

    /// Parse every raw option into a value set.
    pub fn parse_all<'a, I>(&self, raw: I) -> Result<PluginOptions, OptionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = PluginOptions::default();
        for r in raw {
            let (name, value) = self.parse(r)?;
            out.set(name, value);
        }
        Ok(out)
    }

    /// Check an already-typed value, e.g. one loaded from a JSON config,
    /// against the declared option of that name.
    pub fn check(&self, name: &str, value: &OptionValue) -> Result<(), OptionError> {
        let spec = self.get(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let bad = |reason: &str| OptionError::BadValue { name: name.to_string(), reason: reason.to_string() };
        match (spec.kind, value) {
            (OptionKind::Flag, OptionValue::Bool(_)) | (OptionKind::Bool, OptionValue::Bool(_)) => Ok(()),
            (OptionKind::Str, OptionValue::Str(_)) => Ok(()),
            (OptionKind::Flag | OptionKind::Bool, OptionValue::Str(_)) => Err(bad("expected true or false")),
            (OptionKind::Str, OptionValue::Bool(_)) => Err(bad("expected a string")),
        }
    }

    fn declare(&mut self, spec: OptionSpec) -> Result<(), OptionError> {
        if self.get(&spec.name).is_some() {
            return Err(OptionError::Duplicate(spec.name));
        }
        self.specs.push(spec);
        Ok(())
    }
}

pub struct OptionScope<'a> {
    registry: &'a mut OptionRegistry,
    plugin:   &'a str,
}

impl OptionScope<'_> {
    pub fn flag(&mut self, name: &str, help: &str) -> Result<(), OptionError> {
        self.add(name, OptionKind::Flag, None, help)
    }

    pub fn boolean(&mut self, name: &str, help: &str) -> Result<(), OptionError> {
        self.add(name, OptionKind::Bool, None, help)
    }

    /// `metavar` names the value in help output and gets the same prefix rule.
    pub fn string(&mut self, name: &str, metavar: &str, help: &str) -> Result<(), OptionError> {
        self.check_prefix(&metavar.to_ascii_lowercase())?;
        self.add(name, OptionKind::Str, Some(metavar.to_string()), help)
    }

    fn add(&mut self, name: &str, kind: OptionKind, metavar: Option<String>, help: &str) -> Result<(), OptionError> {
        self.check_prefix(name)?;
        self.registry.declare(OptionSpec {
            name:  name.to_string(),
            owner: self.plugin.to_string(),
            kind,
            metavar,
            help:  help.to_string(),
        })
    }

    fn check_prefix(&self, name: &str) -> Result<(), OptionError> {
        let ok = name.len() > self.plugin.len() + 1
            && name.starts_with(self.plugin)
            && name.as_bytes()[self.plugin.len()] == b'_';
        if ok {
            Ok(())
        } else {
            Err(OptionError::Unprefixed { plugin: self.plugin.to_string(), name: name.to_string() })
        }
    }
}
