//! Page request parsing.
//!
//! Accepts the Spring-style parameters clients of the conference API send:
//! `page=<n>`, `size=<n>` and any number of `sort=<field>[,asc|desc]`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

static SORT_PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*(?:,\s*([A-Za-z]+)\s*)?$")
        .expect("valid sort param regex")
});

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// One `(field, direction)` sort key, using the wire field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Default and ceiling for the `size` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingDefaults {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingDefaults {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

/// Zero-based page window plus sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Vec<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    /// Row offset of the first item of this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Parses decoded query pairs.
    ///
    /// Unknown parameters are ignored. Invalid `page` falls back to 0 and
    /// invalid `size` to the configured default; `size` is clamped to the
    /// configured maximum.
    ///
    /// # Errors
    /// - `sort` naming a field outside `sortable`.
    /// - `sort` with a direction other than `asc`/`desc`.
    pub fn from_query_pairs(
        pairs: &[(String, String)],
        sortable: &[&str],
        defaults: PagingDefaults,
    ) -> Result<Self, PageRequestError> {
        let mut request = Self {
            page: 0,
            size: defaults.default_size,
            sort: Vec::new(),
        };

        for (key, value) in pairs {
            match key.as_str() {
                "page" => request.page = parse_page(value),
                "size" => request.size = parse_size(value, defaults),
                "sort" => request.sort.push(parse_sort(value, sortable)?),
                _ => {}
            }
        }

        Ok(request)
    }
}

fn parse_page(value: &str) -> u32 {
    value.trim().parse::<i64>().map_or(0, |page| {
        u32::try_from(page.max(0)).unwrap_or(u32::MAX)
    })
}

fn parse_size(value: &str, defaults: PagingDefaults) -> u32 {
    match value.trim().parse::<i64>() {
        Ok(size) if size >= 1 => u32::try_from(size)
            .unwrap_or(u32::MAX)
            .min(defaults.max_size),
        _ => defaults.default_size,
    }
}

fn parse_sort(value: &str, sortable: &[&str]) -> Result<SortOrder, PageRequestError> {
    let caps = SORT_PARAM_RE
        .captures(value)
        .ok_or_else(|| PageRequestError::MalformedSort(value.to_string()))?;
    let field = caps.get(1).map_or("", |m| m.as_str());
    if !sortable.contains(&field) {
        return Err(PageRequestError::UnknownSortField(field.to_string()));
    }

    let direction = match caps.get(2) {
        Some(raw) => Direction::parse(raw.as_str())
            .ok_or_else(|| PageRequestError::MalformedSort(value.to_string()))?,
        None => Direction::Asc,
    };

    Ok(SortOrder {
        field: field.to_string(),
        direction,
    })
}

/// Rejected `sort` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequestError {
    UnknownSortField(String),
    MalformedSort(String),
}

impl Display for PageRequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSortField(field) => write!(f, "cannot sort by unknown field `{field}`"),
            Self::MalformedSort(value) => write!(f, "malformed sort parameter `{value}`"),
        }
    }
}

impl Error for PageRequestError {}
