use super::errors::ConfigError;
use super::ini::{IniDocument, IniSection};
use super::literal::{evaluate, Value};

use hyperneat::Point;

use std::num::NonZeroUsize;
use std::str::FromStr;

/// Typed access to the entries of one section.
pub(crate) struct SectionReader<'a> {
    section: &'a IniSection,
}

impl<'a> SectionReader<'a> {
    pub(crate) fn new(document: &'a IniDocument, name: &str) -> Result<SectionReader<'a>, ConfigError> {
        SectionReader::optional(document, name)
            .ok_or_else(|| ConfigError::MissingSection(name.to_string()))
    }

    pub(crate) fn optional(document: &'a IniDocument, name: &str) -> Option<SectionReader<'a>> {
        document.section(name).map(|section| SectionReader { section })
    }

    fn name(&self) -> &str {
        self.section.name()
    }

    /// Fails on the first entry whose key is not in `known`.
    pub(crate) fn reject_unknown<S: AsRef<str>>(&self, known: &[S]) -> Result<(), ConfigError> {
        match self
            .section
            .entries()
            .find(|(key, _)| !known.iter().any(|k| k.as_ref() == *key))
        {
            Some((key, _)) => Err(ConfigError::UnknownKey {
                section: self.name().to_string(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a str> {
        self.section.get(key)
    }

    pub(crate) fn required(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: self.name().to_string(),
            key: key.to_string(),
        })
    }

    pub(crate) fn invalid(&self, key: &str, value: &str, expected: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name().to_string(),
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub(crate) fn parse<T: FromStr>(&self, key: &str, expected: &str) -> Result<T, ConfigError> {
        let value = self.required(key)?;
        value.parse().map_err(|_| self.invalid(key, value, expected))
    }

    pub(crate) fn parse_or<T: FromStr>(&self, key: &str, default: T, expected: &str) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(_) => self.parse(key, expected),
            None => Ok(default),
        }
    }

    pub(crate) fn boolean(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.required(key)?;
        parse_bool(value).ok_or_else(|| self.invalid(key, value, "a boolean"))
    }

    pub(crate) fn boolean_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(_) => self.boolean(key),
            None => Ok(default),
        }
    }

    /// Parses a float and checks it against `valid`.
    pub(crate) fn float_where(
        &self,
        key: &str,
        expected: &str,
        valid: impl Fn(f32) -> bool,
    ) -> Result<f32, ConfigError> {
        let value = self.required(key)?;
        value
            .parse::<f32>()
            .ok()
            .filter(|v| !v.is_nan() && valid(*v))
            .ok_or_else(|| self.invalid(key, value, expected))
    }

    pub(crate) fn float(&self, key: &str) -> Result<f32, ConfigError> {
        self.float_where(key, "a number", |_| true)
    }

    pub(crate) fn probability(&self, key: &str) -> Result<f32, ConfigError> {
        self.float_where(key, "a probability in [0, 1]", |p| (0.0..=1.0).contains(&p))
    }

    pub(crate) fn probability_or(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        match self.get(key) {
            Some(_) => self.probability(key),
            None => Ok(default),
        }
    }

    pub(crate) fn positive(&self, key: &str) -> Result<NonZeroUsize, ConfigError> {
        self.parse(key, "a positive integer")
    }

    pub(crate) fn positive_or(&self, key: &str, default: NonZeroUsize) -> Result<NonZeroUsize, ConfigError> {
        self.parse_or(key, default, "a positive integer")
    }

    pub(crate) fn count(&self, key: &str) -> Result<usize, ConfigError> {
        self.parse(key, "a non-negative integer")
    }

    pub(crate) fn count_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        self.parse_or(key, default, "a non-negative integer")
    }

    /// Evaluates the value of `key` as a literal expression.
    pub(crate) fn literal(&self, key: &str) -> Result<Value, ConfigError> {
        evaluate(self.required(key)?).map_err(|source| ConfigError::Literal {
            section: self.name().to_string(),
            key: key.to_string(),
            source,
        })
    }

    /// Evaluates `key` as a list of `(x, y)` points.
    pub(crate) fn points(&self, key: &str) -> Result<Vec<Point>, ConfigError> {
        let value = self.literal(key)?;
        self.point_list(key, &value)
    }

    pub(crate) fn point_list(&self, key: &str, value: &Value) -> Result<Vec<Point>, ConfigError> {
        let invalid = || self.invalid(key, &value.to_string(), "a list of (x, y) points");
        value
            .items()
            .ok_or_else(invalid)?
            .iter()
            .map(|item| item.as_point().ok_or_else(invalid))
            .collect()
    }

    /// Evaluates `key` as a list of strings.
    pub(crate) fn strings(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        let value = self.literal(key)?;
        let invalid = || self.invalid(key, &value.to_string(), "a list of strings");
        value
            .items()
            .ok_or_else(invalid)?
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect()
    }
}

/// Parses the boolean spellings accepted by configuration files.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
