//! One-hot vocabulary for categorical columns

use std::collections::HashMap;

/// Frozen category vocabulary, ordered by first appearance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneHotEncoder {
    categories: Vec<String>,
    mapping: HashMap<String, usize>,
}

impl OneHotEncoder {
    /// Collect categories in first-seen order
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let mut encoder = Self::default();
        for val in values {
            let val = val.as_ref();
            if !encoder.mapping.contains_key(val) {
                encoder.mapping.insert(val.to_string(), encoder.categories.len());
                encoder.categories.push(val.to_string());
            }
        }
        encoder
    }

    /// Indicator position of `value`; `None` for unseen categories
    pub fn position(&self, value: &str) -> Option<usize> {
        self.mapping.get(value).copied()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
