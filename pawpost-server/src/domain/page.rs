use crate::domain::DomainError;
use serde::Serialize;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only the literal `"asc"` sorts ascending; anything else is descending.
    pub fn parse(direction: &str) -> Self {
        match direction {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSortField {
    Id,
    Title,
    Views,
    CreatedAt,
    UpdatedAt,
}

impl PostSortField {
    pub fn parse(sort_by: &str) -> Result<Self, DomainError> {
        match sort_by {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "views" => Ok(Self::Views),
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            other => Err(DomainError::ValidationError(format!(
                "Cannot sort posts by '{}'",
                other
            ))),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Views => "views",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Zero-based page of a sorted listing.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: PostSortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn new(page: i64, size: i64, sort_by: &str, direction: &str) -> Result<Self, DomainError> {
        if page < 0 {
            return Err(DomainError::ValidationError(
                "Page cannot be negative".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(DomainError::ValidationError(format!(
                "Size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if page.checked_mul(size).is_none() {
            return Err(DomainError::ValidationError(
                "Page is out of range".to_string(),
            ));
        }

        Ok(Self {
            page,
            size,
            sort: PostSortField::parse(sort_by)?,
            direction: SortDirection::parse(direction),
        })
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_literal_asc_is_ascending() {
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        for other in ["ASC", "desc", "", "descending", "up"] {
            assert_eq!(SortDirection::parse(other), SortDirection::Desc);
        }
    }

    #[test]
    fn sort_field_accepts_both_spellings() {
        assert_eq!(
            PostSortField::parse("createdAt").unwrap(),
            PostSortField::parse("created_at").unwrap()
        );
        assert!(PostSortField::parse("password").is_err());
    }

    #[test]
    fn page_bounds_are_validated() {
        assert!(PageRequest::new(-1, 10, "id", "asc").is_err());
        assert!(PageRequest::new(0, 0, "id", "asc").is_err());
        assert!(PageRequest::new(0, 101, "id", "asc").is_err());

        let page = PageRequest::new(3, 20, "views", "whatever").unwrap();
        assert_eq!(page.offset(), 60);
        assert_eq!(page.direction, SortDirection::Desc);
    }

    #[test]
    fn page_whose_offset_overflows_is_rejected() {
        assert!(matches!(
            PageRequest::new(i64::MAX / 10, 100, "id", "asc"),
            Err(DomainError::ValidationError(_))
        ));

        let last = PageRequest::new(i64::MAX / 100, 100, "id", "asc").unwrap();
        assert!(last.offset() > 0);
    }
}
