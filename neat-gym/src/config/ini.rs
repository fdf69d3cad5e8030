//! The INI dialect of neat-python configuration files.
//!
//! Sections open with a `[Name]` header and hold `key = value`
//! (or `key: value`) lines. Keys are case-insensitive, section
//! names are not. Lines starting with `#` or `;` are comments,
//! and an indented line continues the previous value.
use super::errors::IniError;

use std::fmt;
use std::str::FromStr;

/// A parsed configuration file, in file order.
///
/// # Examples
/// ```
/// use neat_gym::config::IniDocument;
///
/// let text = "[Gym]\nenvironment = CartPole-v1\n\n[Substrate]\ninput = [(-1, -1),\n    (1, -1)]\n";
/// let document: IniDocument = text.parse().unwrap();
///
/// assert_eq!(document.get("Gym", "ENVIRONMENT"), Some("CartPole-v1"));
/// assert_eq!(document.get("Substrate", "input"), Some("[(-1, -1),\n(1, -1)]"));
/// assert_eq!(document.to_string().parse::<IniDocument>().unwrap(), document);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

/// A named group of `key = value` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: &str) -> IniSection {
        IniSection {
            name: name.to_string(),
            entries: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key` to `value`, replacing any previous value
    /// in place.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = key.to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key, value.to_string())),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over the entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IniDocument {
    pub fn new() -> IniDocument {
        IniDocument::default()
    }

    /// Parses configuration text.
    ///
    /// # Errors
    /// Returns an error naming the offending line on a duplicate
    /// section or key, an entry before the first section, or a
    /// line that is neither a header, a comment nor an entry.
    pub fn parse(text: &str) -> Result<IniDocument, IniError> {
        let mut document = IniDocument::new();
        // Whether an entry may be continued by the next line.
        let mut open_entry = false;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                open_entry = false;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if raw.starts_with(char::is_whitespace) && open_entry {
                if let Some(entry) = document
                    .sections
                    .last_mut()
                    .and_then(|s| s.entries.last_mut())
                {
                    entry.1.push('\n');
                    entry.1.push_str(trimmed);
                }
                continue;
            }

            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                let name = name.trim();
                if document.section(name).is_some() {
                    return Err(IniError::DuplicateSection {
                        line,
                        section: name.to_string(),
                    });
                }
                document.sections.push(IniSection::new(name));
                open_entry = false;
                continue;
            }

            let split = trimmed
                .find(|c: char| c == '=' || c == ':')
                .ok_or_else(|| IniError::Malformed {
                    line,
                    content: trimmed.to_string(),
                })?;
            let key = trimmed[..split].trim().to_lowercase();
            let value = trimmed[split + 1..].trim();
            if key.is_empty() {
                return Err(IniError::Malformed {
                    line,
                    content: trimmed.to_string(),
                });
            }

            let section = document
                .sections
                .last_mut()
                .ok_or(IniError::EntryOutsideSection { line })?;
            if section.contains_key(&key) {
                return Err(IniError::DuplicateKey {
                    line,
                    section: section.name.clone(),
                    key,
                });
            }
            section.entries.push((key, value.to_string()));
            open_entry = true;
        }

        Ok(document)
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Returns the section called `name`, appending
    /// an empty one if there is none.
    pub fn section_mut(&mut self, name: &str) -> &mut IniSection {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(IniSection::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// Iterates over the sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }
}

impl FromStr for IniDocument {
    type Err = IniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IniDocument::parse(s)
    }
}

impl fmt::Display for IniSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        for (key, value) in &self.entries {
            let mut lines = value.split('\n');
            writeln!(f, "{} = {}", key, lines.next().unwrap_or_default())?;
            for line in lines {
                writeln!(f, "    {}", line)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\
# Leading comment
[NEAT]
fitness_criterion     = max
Pop_Size: 150

; another comment
[Substrate]
input  = [(-1., -1.),
          (0., -1.),
    # comments inside a value are skipped
          (1., -1.)]
output = [(0., 1.)]
";

    #[test]
    fn entries_and_continuations() {
        let document = IniDocument::parse(TEXT).unwrap();
        assert_eq!(document.sections().count(), 2);
        assert_eq!(document.get("NEAT", "pop_size"), Some("150"));
        assert_eq!(document.get("NEAT", "fitness_criterion"), Some("max"));
        assert_eq!(
            document.get("Substrate", "input"),
            Some("[(-1., -1.),\n(0., -1.),\n(1., -1.)]")
        );
        assert_eq!(document.get("neat", "pop_size"), None);
    }

    #[test]
    fn display_round_trips() {
        let document = IniDocument::parse(TEXT).unwrap();
        let text = document.to_string();
        assert!(text.starts_with("[NEAT]\nfitness_criterion = max\npop_size = 150\n\n[Substrate]\n"));
        assert_eq!(IniDocument::parse(&text).unwrap(), document);
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert_eq!(
            IniDocument::parse("key = 1"),
            Err(IniError::EntryOutsideSection { line: 1 })
        );
        assert_eq!(
            IniDocument::parse("[A]\nx = 1\n\n[A]"),
            Err(IniError::DuplicateSection {
                line: 4,
                section: "A".to_string()
            })
        );
        assert_eq!(
            IniDocument::parse("[A]\nx = 1\nX = 2"),
            Err(IniError::DuplicateKey {
                line: 3,
                section: "A".to_string(),
                key: "x".to_string()
            })
        );
        assert_eq!(
            IniDocument::parse("[A]\nnot an entry"),
            Err(IniError::Malformed {
                line: 2,
                content: "not an entry".to_string()
            })
        );
    }

    #[test]
    fn blank_line_ends_a_value() {
        // An indented line after a blank line does not continue the value.
        assert!(matches!(
            IniDocument::parse("[A]\nx = 1\n\n    2"),
            Err(IniError::Malformed { line: 4, .. })
        ));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut document = IniDocument::parse("[A]\nx = 1\ny = 2").unwrap();
        document.section_mut("A").set("X", "3");
        document.section_mut("B").set("z", "4");
        assert_eq!(document.to_string(), "[A]\nx = 3\ny = 2\n\n[B]\nz = 4\n");
    }
}
