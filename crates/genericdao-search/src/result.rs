use serde::Serialize;

/// One page of search results plus the number of rows matching without paging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult<T> {
    pub results: Vec<T>,
    pub total_count: u64,
}

impl<T> SearchResult<T> {
    pub fn new(results: Vec<T>, total_count: u64) -> Self {
        Self {
            results,
            total_count,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether rows exist beyond this page.
    pub fn has_more(&self, first_result: usize) -> bool {
        (first_result + self.results.len()) < usize::try_from(self.total_count).unwrap_or(usize::MAX)
    }

    /// Convert every row, keeping the total.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<SearchResult<U>, E> {
        let results = self.results.into_iter().map(f).collect::<Result<Vec<U>, E>>()?;
        Ok(SearchResult {
            results,
            total_count: self.total_count,
        })
    }
}
