//! Event categories and offset pagination.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TurnoutError};

id_type!(
    /// Unique identifier for a category.
    CategoryId
);

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// A category events are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TurnoutError::ValidationError(
                "Field: name. Error: must not be blank.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Offset pagination: skip `from` rows, return at most `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from: i64,
    pub size: i64,
}

impl Page {
    /// Build a page, rejecting a negative offset or a non-positive size.
    pub fn new(from: i64, size: i64) -> Result<Self> {
        if from < 0 {
            return Err(TurnoutError::ValidationError(format!(
                "Parameter 'from' must be positive or zero, got {from}."
            )));
        }
        if size <= 0 {
            return Err(TurnoutError::ValidationError(format!(
                "Parameter 'size' must be positive, got {size}."
            )));
        }
        Ok(Self { from, size })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            from: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(0, 10).unwrap(), Page::default());
        assert!(Page::new(-1, 10).is_err());
        assert!(Page::new(0, 0).is_err());
        assert_eq!(Page::new(20, 5).unwrap().from, 20);
    }
}
