use crate::memos::{ListQuery, MemosClient};
use errors::ClientError;
use mm_core::Memo;
use tracing::debug;

/// Lazy walk over paginated list results.
///
/// Finite and not restartable: the pager owns the current page buffer and
/// the next-page cursor, issues one HTTP GET per pull, and stops when the
/// upstream returns no further cursor. Each pull may perform I/O and can
/// fail with a typed error. Dropping the pager — or simply ceasing to
/// pull it — issues no further page requests; that is the backpressure
/// mechanism bounding cost for wide date ranges. Nothing is cached across
/// separate pagers.
pub struct MemoPager<'a> {
    client: &'a MemosClient,
    query: ListQuery,
    page_token: Option<String>,
    exhausted: bool,
    pages_fetched: u32,
    scanned: usize,
}

impl<'a> MemoPager<'a> {
    pub(crate) fn new(client: &'a MemosClient, query: ListQuery) -> Self {
        Self {
            client,
            query,
            page_token: None,
            exhausted: false,
            pages_fetched: 0,
            scanned: 0,
        }
    }

    /// Fetches the next page, or `None` once the upstream signals the end
    /// of the sequence. Strictly sequential: one in-flight request at a
    /// time, preserving cursor ordering.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Memo>>, ClientError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .client
            .list_page(&self.query, self.page_token.as_deref())
            .await?;
        self.pages_fetched += 1;
        self.scanned += page.memos.len();
        debug!(
            page = self.pages_fetched,
            memos = page.memos.len(),
            has_next = page.next_page_token.is_some(),
            "Fetched memo page"
        );

        match page.next_page_token {
            Some(token) => self.page_token = Some(token),
            None => self.exhausted = true,
        }
        if page.memos.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(page.memos))
    }

    /// Pages fetched so far (one HTTP call each).
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Memos seen across all fetched pages, before any filtering.
    pub fn scanned(&self) -> usize {
        self.scanned
    }
}
