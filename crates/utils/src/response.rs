//! Shared JSON response envelopes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Uniform API envelope: `success` plus either `data` or `message`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + per_page - 1) / per_page
        };
        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Pagination query parameters with the listing defaults (10 rows per page).
///
/// The fields parse from strings as well as numbers: when flattened into a
/// larger query struct, urlencoded values reach serde as strings.
#[derive(Debug, Clone, Copy, Deserialize, TS)]
pub struct PageParams {
    #[serde(default = "default_page", deserialize_with = "de_i64")]
    pub page: i64,
    #[serde(default = "default_per_page", deserialize_with = "de_i64")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    10
}

fn de_i64<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    struct I64Visitor;

    impl serde::de::Visitor<'_> for I64Visitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an integer or a string holding one")
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(E::custom)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<i64, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(I64Visitor)
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl PageParams {
    /// Clamped page/per_page, and the OFFSET for SQL.
    pub fn clamp(&self) -> (i64, i64, i64) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, 100);
        (page, per_page, (page - 1) * per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_total_pages() {
        let p = Paginated::new(vec![1, 2, 3], 1, 10, 23);
        assert_eq!(p.total_pages, 3);
        let empty: Paginated<i32> = Paginated::new(vec![], 1, 10, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_params_clamp() {
        let p = PageParams {
            page: 0,
            per_page: 1000,
        };
        assert_eq!(p.clamp(), (1, 100, 0));
        let p = PageParams {
            page: 3,
            per_page: 10,
        };
        assert_eq!(p.clamp(), (3, 10, 20));
    }
}
