//! Label table
//!
//! One label per line, indexed by line order. ImageNet synset files
//! (`n01440764 tench, Tinca tinca`) keep only the text after the synset id.

use std::path::Path;

use tracing::debug;

use crate::utils::error::{Result, VisionError};

/// Ordered class labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Parse labels from text, skipping blank lines
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(strip_synset_id)
            .collect();
        Self { names }
    }

    /// Load labels from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VisionError::PathNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| VisionError::Labels(format!("{}: {}", path.display(), e)))?;
        let labels = Self::parse(&text);
        if labels.is_empty() {
            return Err(VisionError::Labels(format!(
                "{} contains no labels",
                path.display()
            )));
        }
        debug!("Loaded {} labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    /// Generic `class_<i>` labels for a model without a label file
    pub fn generic(num_classes: usize) -> Self {
        Self {
            names: (0..num_classes).map(|i| format!("class_{}", i)).collect(),
        }
    }

    /// Label for a class index; unknown indices render as `class_<index>`
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn strip_synset_id(line: &str) -> String {
    match line.split_once(' ') {
        Some((id, rest))
            if id.len() == 9
                && id.starts_with('n')
                && id[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest.trim().to_string()
        }
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_lines() {
        let labels = Labels::parse("cat\n\n dog \nbird\n");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.name(1), "dog");
    }

    #[test]
    fn test_parse_strips_synset_ids() {
        let labels = Labels::parse("n01440764 tench, Tinca tinca\nn01443537 goldfish\n");
        assert_eq!(labels.name(0), "tench, Tinca tinca");
        assert_eq!(labels.name(1), "goldfish");
    }

    #[test]
    fn test_plain_label_with_space_is_kept() {
        let labels = Labels::parse("golden retriever\n");
        assert_eq!(labels.name(0), "golden retriever");
    }

    #[test]
    fn test_unknown_index_falls_back() {
        let labels = Labels::parse("cat\n");
        assert_eq!(labels.name(4), "class_4");
        assert_eq!(Labels::generic(2).name(1), "class_1");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "cat\ndog\n").unwrap();

        let labels = Labels::load(&path).unwrap();
        assert_eq!(labels.len(), 2);

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "\n\n").unwrap();
        assert!(Labels::load(&empty).is_err());
        assert!(Labels::load(&dir.path().join("missing.txt")).is_err());
    }
}
