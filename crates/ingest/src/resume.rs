//! Startup position.

use alloy::primitives::BlockNumber;
use chainsync_store::{StoreResult, WriterHandle};

/// The highest block persisted so far, or 0 for an empty store.
pub async fn resume_position(writer: &WriterHandle) -> StoreResult<BlockNumber> {
    Ok(writer.latest_block().await?.unwrap_or_default())
}

/// Where the next upstream query starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Next block to request.
    pub from_block: BlockNumber,
}

impl Cursor {
    /// The cursor after a restart: strictly past the resume position, and
    /// never before the configured start block.
    pub const fn resume(resume_position: BlockNumber, start_block: BlockNumber) -> Self {
        let after = resume_position.saturating_add(1);
        Self { from_block: if after > start_block { after } else { start_block } }
    }

    /// Move to `next_block` when upstream supplied one. The cursor never
    /// moves backwards.
    pub fn advance(&mut self, next_block: Option<BlockNumber>) {
        if let Some(next) = next_block {
            self.from_block = self.from_block.max(next);
        }
    }

    /// The highest block scanned, one before the cursor.
    pub const fn scanned_to(&self) -> BlockNumber {
        self.from_block.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsync_store::{
        SyncStore, WriterConfig, WriterTask, conformance::make_block, mem::MemStore,
    };
    use tokio_util::sync::CancellationToken;

    #[test]
    fn cursor_rules() {
        assert_eq!(Cursor::resume(0, 0).from_block, 1);
        assert_eq!(Cursor::resume(0, 500).from_block, 500);
        assert_eq!(Cursor::resume(800, 500).from_block, 801);

        let mut cursor = Cursor::resume(10, 0);
        cursor.advance(None);
        assert_eq!(cursor.from_block, 11);
        cursor.advance(Some(20));
        assert_eq!(cursor.scanned_to(), 19);
        cursor.advance(Some(15));
        assert_eq!(cursor.from_block, 20);
    }

    #[tokio::test]
    async fn position_tracks_highest_block() {
        let store = MemStore::new();
        let (writer, _join) =
            WriterTask::spawn(store.clone(), WriterConfig::default(), CancellationToken::new());
        assert_eq!(resume_position(&writer).await.unwrap(), 0);

        store.insert_blocks(vec![make_block(42), make_block(7)]).await.unwrap();
        assert_eq!(resume_position(&writer).await.unwrap(), 42);
    }
}
