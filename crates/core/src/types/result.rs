//! Uniform operation results and pagination.
//!
//! Every connector operation reports through [`OperationResult`] rather than
//! failing outright, so a batch where 10 SKUs succeed and 2 fail comes back
//! as one value carrying both lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error_code::ErrorCode;

/// Why one item of a batch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    /// The item's identifier (SKU for stock and price updates).
    pub item_id: String,
    pub code: ErrorCode,
    pub message: String,
}

impl ItemFailure {
    /// Create an item failure.
    #[must_use]
    pub fn new(item_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            code,
            message: message.into(),
        }
    }
}

/// Result of a connector operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationResult<T> {
    /// Everything succeeded.
    Success { data: T },
    /// Some items succeeded and some failed.
    #[serde(rename_all = "camelCase")]
    PartialSuccess {
        data: T,
        failed_items: Vec<ItemFailure>,
    },
    /// The operation failed. Batch operations where every item failed still
    /// report the per-item reasons.
    #[serde(rename_all = "camelCase")]
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failed_items: Vec<ItemFailure>,
    },
}

impl<T> OperationResult<T> {
    /// Create a success.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error without item details.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
            failed_items: Vec::new(),
        }
    }

    /// Whether the operation fully succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the operation partially succeeded.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::PartialSuccess { .. })
    }

    /// Whether the operation failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The error code, if the operation failed.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The data, if any was produced.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } | Self::PartialSuccess { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Consume and return the data, if any was produced.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data } | Self::PartialSuccess { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Item-level failures (empty for plain success).
    #[must_use]
    pub fn failed_items(&self) -> &[ItemFailure] {
        match self {
            Self::Success { .. } => &[],
            Self::PartialSuccess { failed_items, .. } | Self::Error { failed_items, .. } => {
                failed_items
            }
        }
    }

    /// Map the data, preserving success/partial/error shape.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationResult<U> {
        match self {
            Self::Success { data } => OperationResult::Success { data: f(data) },
            Self::PartialSuccess { data, failed_items } => OperationResult::PartialSuccess {
                data: f(data),
                failed_items,
            },
            Self::Error {
                code,
                message,
                failed_items,
            } => OperationResult::Error {
                code,
                message,
                failed_items,
            },
        }
    }
}

/// Accumulates per-item outcomes of a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    pub successful: Vec<T>,
    pub failed: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// Create an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful item.
    pub fn succeed(&mut self, item: T) {
        self.successful.push(item);
    }

    /// Record a failed item.
    pub fn fail(&mut self, failure: ItemFailure) {
        self.failed.push(failure);
    }

    /// Merge another outcome into this one.
    pub fn extend(&mut self, other: Self) {
        self.successful.extend(other.successful);
        self.failed.extend(other.failed);
    }

    /// Total number of items recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.failed.is_empty()
    }

    /// Collapse into an [`OperationResult`].
    ///
    /// No failures gives `Success` (including the empty batch); a mix gives
    /// `PartialSuccess`; all items failing gives `Error` with `failure_code`
    /// and the per-item reasons.
    #[must_use]
    pub fn into_result(self, failure_code: ErrorCode) -> OperationResult<Vec<T>> {
        if self.failed.is_empty() {
            OperationResult::Success {
                data: self.successful,
            }
        } else if self.successful.is_empty() {
            OperationResult::Error {
                code: failure_code,
                message: format!("all {} items failed", self.failed.len()),
                failed_items: self.failed,
            }
        } else {
            OperationResult::PartialSuccess {
                data: self.successful,
                failed_items: self.failed,
            }
        }
    }
}

/// Page request for list operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOptions {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Only return records changed/created after this instant.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

const fn default_page() -> u32 {
    1
}

const fn default_page_size() -> u32 {
    50
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            since: None,
        }
    }
}

impl PaginationOptions {
    /// Largest page size any adapter is asked for.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Create options for a page.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            since: None,
        }
    }

    /// Clamp page to >= 1 and page size to 1..=`MAX_PAGE_SIZE`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, Self::MAX_PAGE_SIZE),
            since: self.since,
        }
    }
}

/// One page of a list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    /// Total records across all pages, when the marketplace reports it.
    pub total: Option<u64>,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// Build a page, deriving `has_more` from `total` when known and from a
    /// full page otherwise.
    #[must_use]
    pub fn new(items: Vec<T>, options: &PaginationOptions, total: Option<u64>) -> Self {
        let has_more = total.map_or_else(
            || items.len() >= options.page_size as usize,
            |total| u64::from(options.page) * u64::from(options.page_size) < total,
        );
        Self {
            items,
            page: options.page,
            page_size: options.page_size,
            total,
            has_more,
        }
    }
}
