//! Memo snapshot queries.

use crate::error::ResurfaceResult;
use crate::types::{Memo, MemoFilter, MemoId};

/// Read access to the memo archive.
pub trait MemoStore: Send + Sync {
    /// List memos matching the filter.
    fn list_memos(&self, filter: &MemoFilter) -> ResurfaceResult<Vec<Memo>>;

    /// Get a single memo (with content) by id.
    fn get_memo(&self, id: MemoId) -> ResurfaceResult<Option<Memo>>;
}
