//! Class-name list.
//!
//! The list is a plain text file with one class name per line. Line order
//! defines the class id, so `names[0]` is the label for class id 0.

use std::path::Path;

use crate::error::{PerceptionError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(PerceptionError::config("class list is empty"));
        }
        Ok(Self { names })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PerceptionError::io(format!("failed to read class file {}", path.display()), e)
        })?;
        let classes = Self::parse(&raw)?;
        log::debug!(
            "loaded {} class names from {}",
            classes.len(),
            path.display()
        );
        Ok(classes)
    }

    /// Parse one name per line. Trailing blank lines are ignored; a blank line
    /// between names would shift every following class id and is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines: Vec<&str> = raw.lines().map(|line| line.trim()).collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        if let Some(pos) = lines.iter().position(|line| line.is_empty()) {
            return Err(PerceptionError::config(format!(
                "class list has a blank entry at line {}",
                pos + 1
            )));
        }
        Self::new(lines.into_iter().map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Label used on overlays; unknown ids render as `class<N>`.
    pub fn label(&self, class_id: usize) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class{}", class_id))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_name_per_line() -> Result<()> {
        let classes = ClassNames::parse("person\nbicycle\ncar\n\n")?;
        assert_eq!(classes.len(), 3);
        assert_eq!(classes.get(0), Some("person"));
        assert_eq!(classes.get(2), Some("car"));
        assert_eq!(classes.get(3), None);
        assert_eq!(classes.label(7), "class7");
        Ok(())
    }

    #[test]
    fn keeps_multi_word_names() -> Result<()> {
        let classes = ClassNames::parse("traffic light\r\nfire hydrant\r\n")?;
        assert_eq!(classes.names(), &["traffic light", "fire hydrant"]);
        Ok(())
    }

    #[test]
    fn rejects_empty_and_gapped_lists() {
        assert!(matches!(
            ClassNames::parse("\n\n"),
            Err(PerceptionError::Configuration(_))
        ));
        assert!(matches!(
            ClassNames::parse("person\n\ncar\n"),
            Err(PerceptionError::Configuration(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ClassNames::load("/nonexistent/coco.names").unwrap_err();
        assert!(matches!(err, PerceptionError::Io { .. }));
    }
}
