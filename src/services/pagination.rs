use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageRequest {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.page_size()
    }
}

#[derive(Debug)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Count the query, then fetch the requested page of it.
pub async fn fetch_page<E, C>(
    query: Select<E>,
    conn: &C,
    request: PageRequest,
) -> Result<PaginatedResult<E::Model>, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let total_count = query.clone().count(conn).await?;
    let items = query
        .limit(request.page_size())
        .offset(request.offset())
        .all(conn)
        .await?;

    Ok(PaginatedResult {
        items,
        total_count,
        page: request.page(),
        page_size: request.page_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = PageRequest::default();
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_clamps_out_of_range_values() {
        let request = PageRequest {
            page: Some(0),
            page_size: Some(1_000),
        };
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), MAX_PAGE_SIZE);

        let request = PageRequest {
            page: Some(3),
            page_size: Some(0),
        };
        assert_eq!(request.page_size(), 1);
        assert_eq!(request.offset(), 2);
    }
}
