use std::sync::Arc;

use chainkv_store::KvStore;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::clock::{Clock, SystemClock};
use crate::config::{HeightMode, LedgerConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{ChainReport, Violation};

/// State guarded by the writer lock.
#[derive(Debug, Default)]
struct WriterState {
    /// Known height in `HeightMode::Cached`; `None` until the first scan.
    cached_height: Option<i64>,
}

/// Height-keyed, hash-linked block ledger over a [`KvStore`].
///
/// Heights are never persisted separately: the current height is the number
/// of stored entries minus one (`-1` for an empty store). Appends hold the
/// writer lock across the whole derive-then-write sequence, so two
/// concurrent `add_block` calls can never target the same height.
pub struct Blockchain<S: KvStore + ?Sized = dyn KvStore> {
    store: Arc<S>,
    writer: RwLock<WriterState>,
    clock: Arc<dyn Clock>,
    height_mode: HeightMode,
}

impl<S: KvStore + ?Sized> Blockchain<S> {
    /// Engine with scan-derived height and the system clock.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &LedgerConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            writer: RwLock::new(WriterState::default()),
            clock: Arc::new(SystemClock),
            height_mode: config.height_mode,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn height_mode(&self) -> HeightMode {
        self.height_mode
    }

    /// Insert the genesis block if the ledger is empty. Idempotent.
    pub async fn initialize(&self) -> LedgerResult<()> {
        let mut state = self.writer.write().await;
        let height = self.height_locked(&mut state).await?;
        if height < 0 {
            self.write_genesis(&mut state).await?;
        } else {
            debug!(height, "ledger already initialized");
        }
        Ok(())
    }

    /// Current height: stored entry count minus one, `-1` when empty.
    pub async fn derive_height(&self) -> LedgerResult<i64> {
        match self.height_mode {
            HeightMode::Scan => self.scan_height().await,
            HeightMode::Cached => {
                let mut state = self.writer.write().await;
                self.height_locked(&mut state).await
            }
        }
    }

    /// Same as [`Self::derive_height`].
    pub async fn get_block_height(&self) -> LedgerResult<i64> {
        self.derive_height().await
    }

    /// Append a block carrying `candidate.body` on top of the current tip.
    ///
    /// On an empty ledger the genesis block is written first; if the
    /// candidate is itself the genesis sentinel it becomes the genesis block.
    /// All other candidate fields are ignored and assigned here.
    ///
    /// The genesis write is committed on its own: if the append that follows
    /// it fails, the error is returned and the ledger keeps its genesis block.
    pub async fn add_block(&self, candidate: Block) -> LedgerResult<Block> {
        let mut state = self.writer.write().await;

        let mut current = self.height_locked(&mut state).await?;
        if current < 0 {
            let genesis = self.write_genesis(&mut state).await?;
            if candidate.is_genesis_candidate() {
                return Ok(genesis);
            }
            current = 0;
        }

        let tip_height = to_key(current);
        let tip = self.get_block(tip_height).await?;

        let mut block = Block::new(candidate.body);
        block.height = tip_height + 1;
        block.time = self.clock.now_secs();
        block.previous_block_hash = tip.hash;
        block.seal()?;

        self.put_block(&block).await?;
        self.advance_cache(&mut state, block.height);

        debug!(height = block.height, hash = %block.hash, "block appended");
        Ok(block)
    }

    /// Load the block stored at `height`.
    pub async fn get_block(&self, height: u64) -> LedgerResult<Block> {
        let bytes = self
            .store
            .get(height)
            .await?
            .ok_or(LedgerError::NotFound { height })?;
        Block::decode(height, &bytes)
    }

    /// The block at the current height, if any.
    pub async fn tip(&self) -> LedgerResult<Option<Block>> {
        let height = self.derive_height().await?;
        if height < 0 {
            return Ok(None);
        }
        self.get_block(to_key(height)).await.map(Some)
    }

    /// Self-integrity check of one block.
    ///
    /// Returns `false` on a hash mismatch; only lookup and decode failures
    /// are errors.
    pub async fn validate_block(&self, height: u64) -> LedgerResult<bool> {
        let block = self.get_block(height).await?;
        check_block(&block)
    }

    /// Check every block's self-integrity and every link to its successor.
    ///
    /// All violations are collected; the pass never stops at the first one.
    /// The last block has no successor and gets the self-integrity check only.
    pub async fn validate_chain(&self) -> LedgerResult<ChainReport> {
        let _guard = self.writer.read().await;

        let height = self.scan_height().await?;
        let mut report = ChainReport::new(height);
        if height < 0 {
            info!("validated empty ledger");
            return Ok(report);
        }

        let last = to_key(height);
        let mut current = self.get_block(0).await?;
        for i in 0..=last {
            if !check_block(&current)? {
                report.push(Violation::hash_mismatch(i));
            }
            if i == last {
                break;
            }

            let next = self.get_block(i + 1).await?;
            if current.hash != next.previous_block_hash {
                warn!(
                    height = i,
                    hash = %current.hash,
                    next_previous = %next.previous_block_hash,
                    "broken link"
                );
                report.push(Violation::broken_link(i));
            }
            current = next;
        }

        if report.is_valid() {
            info!(height, "chain valid");
        } else {
            info!(
                height,
                errors = report.violations.len(),
                faulty = ?report.faulty_heights(),
                "chain invalid"
            );
        }
        Ok(report)
    }

    /// Every stored block in height order, from one scan.
    pub async fn blocks(&self) -> LedgerResult<Vec<Block>> {
        let _guard = self.writer.read().await;
        let mut blocks = Vec::new();
        for entry in self.store.scan().await? {
            let (key, value) = entry?;
            blocks.push(Block::decode(key, &value)?);
        }
        Ok(blocks)
    }

    /// Overwrite the body of a stored block without re-hashing it or any
    /// later block. Produces exactly the inconsistency validation must catch.
    #[cfg(any(test, feature = "fault-injection"))]
    pub async fn update_block(&self, height: u64, body: impl Into<String>) -> LedgerResult<Block> {
        let _guard = self.writer.write().await;
        let mut block = self.get_block(height).await?;
        block.body = body.into();
        self.put_block(&block).await?;
        warn!(height, body = %block.body, "block body overwritten without re-hashing");
        Ok(block)
    }

    /// Close the underlying store.
    pub async fn close(&self) -> LedgerResult<()> {
        let _guard = self.writer.write().await;
        self.store.close().await?;
        Ok(())
    }

    async fn scan_height(&self) -> LedgerResult<i64> {
        let count = self.store.count().await?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX) - 1)
    }

    async fn height_locked(&self, state: &mut WriterState) -> LedgerResult<i64> {
        match self.height_mode {
            HeightMode::Scan => self.scan_height().await,
            HeightMode::Cached => match state.cached_height {
                Some(height) => Ok(height),
                None => {
                    let height = self.scan_height().await?;
                    state.cached_height = Some(height);
                    Ok(height)
                }
            },
        }
    }

    fn advance_cache(&self, state: &mut WriterState, height: u64) {
        if self.height_mode == HeightMode::Cached {
            state.cached_height = Some(height as i64);
        }
    }

    async fn write_genesis(&self, state: &mut WriterState) -> LedgerResult<Block> {
        let genesis = Block::genesis(self.clock.now_secs())?;
        self.put_block(&genesis).await?;
        self.advance_cache(state, 0);
        info!(hash = %genesis.hash, "genesis block created");
        Ok(genesis)
    }

    async fn put_block(&self, block: &Block) -> LedgerResult<()> {
        let bytes = block.encode()?;
        self.store.put(block.height, bytes).await?;
        Ok(())
    }
}

impl<S: KvStore + ?Sized> std::fmt::Debug for Blockchain<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("height_mode", &self.height_mode)
            .finish_non_exhaustive()
    }
}

fn check_block(block: &Block) -> LedgerResult<bool> {
    let computed = block.compute_hash()?;
    if computed == block.hash {
        return Ok(true);
    }
    warn!(
        height = block.height,
        stored = %block.hash,
        computed = %computed,
        "invalid block hash"
    );
    Ok(false)
}

/// Non-negative height as a store key.
fn to_key(height: i64) -> u64 {
    u64::try_from(height).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chainkv_store::{LogStore, MemoryStore, Scan, StoreError, StoreResult, SyncMode};
    use proptest::prelude::*;

    use super::*;
    use crate::block::GENESIS_BODY;
    use crate::clock::FixedClock;
    use crate::validation::ViolationKind;

    fn chain() -> Blockchain<MemoryStore> {
        Blockchain::new(Arc::new(MemoryStore::new()))
            .with_clock(Arc::new(FixedClock::new(1_700_000_000)))
    }

    async fn chain_with(bodies: &[&str]) -> Blockchain<MemoryStore> {
        let c = chain();
        c.initialize().await.unwrap();
        for body in bodies {
            c.add_block(Block::new(*body)).await.unwrap();
        }
        c
    }

    /// Store whose reads or writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_puts: AtomicBool,
        fail_gets: AtomicBool,
    }

    #[async_trait]
    impl KvStore for FlakyStore {
        async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.inner.put(key, value).await
        }

        async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
            if self.fail_gets.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("read failed".into()));
            }
            self.inner.get(key).await
        }

        async fn scan(&self) -> StoreResult<Scan> {
            self.inner.scan().await
        }

        async fn close(&self) -> StoreResult<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn empty_ledger_has_height_minus_one() {
        let c = chain();
        assert_eq!(c.get_block_height().await.unwrap(), -1);
        assert!(c.tip().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn initialize_creates_single_genesis() {
        let c = chain();
        c.initialize().await.unwrap();
        c.initialize().await.unwrap();
        c.initialize().await.unwrap();

        assert_eq!(c.get_block_height().await.unwrap(), 0);
        assert_eq!(c.store().len(), 1);
        let genesis = c.get_block(0).await.unwrap();
        assert_eq!(genesis.body, GENESIS_BODY);
        assert!(genesis.previous_block_hash.is_empty());
        assert!(c.validate_block(0).await.unwrap());
    }

    #[tokio::test]
    async fn initialize_after_appends_is_noop() {
        let c = chain_with(&["A"]).await;
        c.initialize().await.unwrap();
        assert_eq!(c.get_block_height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scenario_append_and_tamper() {
        let c = chain_with(&["A", "B", "C"]).await;

        assert_eq!(c.get_block_height().await.unwrap(), 3);
        assert_eq!(c.get_block(2).await.unwrap().body, "B");
        assert_eq!(
            c.get_block(3).await.unwrap().previous_block_hash,
            c.get_block(2).await.unwrap().hash
        );
        assert_eq!(c.validate_chain().await.unwrap().into_parts(), (true, vec![]));

        c.update_block(1, "Haha Gotcha").await.unwrap();
        assert!(!c.validate_block(1).await.unwrap());
        assert_eq!(c.validate_chain().await.unwrap().into_parts(), (false, vec![1]));
    }

    #[tokio::test]
    async fn add_block_bootstraps_genesis() {
        let c = chain();
        let first = c.add_block(Block::new("first")).await.unwrap();

        assert_eq!(first.height, 1);
        assert_eq!(c.get_block_height().await.unwrap(), 1);
        let genesis = c.get_block(0).await.unwrap();
        assert_eq!(genesis.body, GENESIS_BODY);
        assert_eq!(first.previous_block_hash, genesis.hash);
    }

    #[tokio::test]
    async fn genesis_candidate_on_empty_ledger_becomes_genesis() {
        let c = chain();
        let block = c.add_block(Block::new(GENESIS_BODY)).await.unwrap();
        assert_eq!(block.height, 0);
        assert_eq!(c.get_block_height().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn engine_assigns_fields_ignoring_candidate() {
        let c = chain_with(&[]).await;
        let mut candidate = Block::new("payload");
        candidate.height = 99;
        candidate.hash = "forged".into();
        candidate.previous_block_hash = "forged".into();
        candidate.time = 5;

        let block = c.add_block(candidate).await.unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.time, 1_700_000_000);
        assert_eq!(block.previous_block_hash, c.get_block(0).await.unwrap().hash);
        assert!(block.verify_hash().unwrap());
        assert_eq!(c.get_block(1).await.unwrap(), block);
    }

    #[tokio::test]
    async fn height_tracks_append_count() {
        let c = chain_with(&[]).await;
        for n in 1..=10i64 {
            c.add_block(Block::new(format!("block-{n}"))).await.unwrap();
            assert_eq!(c.get_block_height().await.unwrap(), n);
        }
    }

    #[tokio::test]
    async fn every_block_links_and_verifies() {
        let c = chain_with(&["a", "b", "c", "d", "e"]).await;
        let height = c.get_block_height().await.unwrap() as u64;
        for i in 0..height {
            let block = c.get_block(i).await.unwrap();
            let next = c.get_block(i + 1).await.unwrap();
            assert_eq!(block.hash, next.previous_block_hash);
            assert!(block.verify_hash().unwrap());
        }
        assert!(c.validate_block(height).await.unwrap());
    }

    #[tokio::test]
    async fn get_missing_block_is_not_found() {
        let c = chain_with(&["A"]).await;
        let err = c.get_block(5).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { height: 5 }));
        assert!(matches!(
            c.validate_block(5).await.unwrap_err(),
            LedgerError::NotFound { height: 5 }
        ));
    }

    #[tokio::test]
    async fn undecodable_value_is_decode_error() {
        let c = chain_with(&["A"]).await;
        c.store().put(1, b"{broken".to_vec()).await.unwrap();

        assert!(matches!(
            c.get_block(1).await.unwrap_err(),
            LedgerError::Decode { height: 1, .. }
        ));
        assert!(matches!(
            c.validate_chain().await.unwrap_err(),
            LedgerError::Decode { height: 1, .. }
        ));
    }

    #[tokio::test]
    async fn tampering_the_tip_is_detected() {
        let c = chain_with(&["A", "B"]).await;
        c.update_block(2, "X").await.unwrap();
        let report = c.validate_chain().await.unwrap();
        assert_eq!(report.faulty_heights(), vec![2]);
        assert_eq!(report.violations[0].kind, ViolationKind::HashMismatch);
    }

    #[tokio::test]
    async fn forged_rehash_breaks_the_link() {
        let c = chain_with(&["A", "B", "C"]).await;

        // Re-hash a tampered block so its self-integrity holds; the link from
        // it to its successor no longer does.
        let mut forged = c.get_block(1).await.unwrap();
        forged.body = "forged".into();
        forged.seal().unwrap();
        c.store().put(1, forged.encode().unwrap()).await.unwrap();

        let report = c.validate_chain().await.unwrap();
        assert_eq!(report.faulty_heights(), vec![1]);
        assert_eq!(report.violations, vec![Violation::broken_link(1)]);
    }

    #[tokio::test]
    async fn validation_collects_every_fault() {
        let c = chain_with(&["A", "B", "C", "D"]).await;
        c.update_block(0, "X").await.unwrap();
        c.update_block(3, "Y").await.unwrap();
        c.update_block(4, "Z").await.unwrap();

        let (valid, faulty) = c.validate_chain().await.unwrap().into_parts();
        assert!(!valid);
        assert_eq!(faulty, vec![0, 3, 4]);
    }

    #[tokio::test]
    async fn empty_ledger_validates() {
        let c = chain();
        let report = c.validate_chain().await.unwrap();
        assert_eq!(report.height, -1);
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn blocks_lists_whole_chain_in_order() {
        let c = chain_with(&["A", "B"]).await;
        let bodies: Vec<String> = c
            .blocks()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.body)
            .collect();
        assert_eq!(bodies, vec![GENESIS_BODY, "A", "B"]);
    }

    #[tokio::test]
    async fn timestamps_come_from_clock() {
        let clock = Arc::new(FixedClock::new(10));
        let c = Blockchain::new(Arc::new(MemoryStore::new())).with_clock(clock.clone());
        c.initialize().await.unwrap();
        clock.advance(7);
        let block = c.add_block(Block::new("later")).await.unwrap();
        assert_eq!(c.get_block(0).await.unwrap().time, 10);
        assert_eq!(block.time, 17);
    }

    #[tokio::test]
    async fn failed_write_leaves_tip_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let c = Blockchain::new(store.clone());
        c.add_block(Block::new("A")).await.unwrap();
        let tip_before = c.tip().await.unwrap();

        store.fail_puts.store(true, Ordering::SeqCst);
        let err = c.add_block(Block::new("B")).await.unwrap_err();
        assert!(matches!(err, LedgerError::StoreFailure(StoreError::Backend(_))));

        store.fail_puts.store(false, Ordering::SeqCst);
        assert_eq!(c.get_block_height().await.unwrap(), 1);
        assert_eq!(c.tip().await.unwrap(), tip_before);
    }

    #[tokio::test]
    async fn failed_genesis_write_writes_nothing() {
        let store = Arc::new(FlakyStore::default());
        store.fail_puts.store(true, Ordering::SeqCst);
        let c = Blockchain::new(store.clone());

        assert!(matches!(
            c.add_block(Block::new("A")).await,
            Err(LedgerError::StoreFailure(_))
        ));
        assert!(matches!(c.initialize().await, Err(LedgerError::StoreFailure(_))));
        assert_eq!(c.get_block_height().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn genesis_survives_failed_first_append() {
        let store = Arc::new(FlakyStore::default());
        store.fail_gets.store(true, Ordering::SeqCst);
        let c = Blockchain::new(store.clone());

        assert!(matches!(
            c.add_block(Block::new("A")).await,
            Err(LedgerError::StoreFailure(_))
        ));

        store.fail_gets.store(false, Ordering::SeqCst);
        assert_eq!(c.get_block_height().await.unwrap(), 0);
        assert_eq!(c.get_block(0).await.unwrap().body, GENESIS_BODY);
    }

    #[tokio::test]
    async fn failed_read_propagates() {
        let store = Arc::new(FlakyStore::default());
        let c = Blockchain::new(store.clone());
        c.initialize().await.unwrap();

        store.fail_gets.store(true, Ordering::SeqCst);
        assert!(matches!(
            c.add_block(Block::new("A")).await,
            Err(LedgerError::StoreFailure(_))
        ));
        assert!(matches!(
            c.validate_block(0).await,
            Err(LedgerError::StoreFailure(_))
        ));

        store.fail_gets.store(false, Ordering::SeqCst);
        assert_eq!(c.get_block_height().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_stay_dense_and_linked() {
        let c = Arc::new(chain());
        c.initialize().await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let c = Arc::clone(&c);
                tokio::spawn(async move { c.add_block(Block::new(format!("tx-{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(c.get_block_height().await.unwrap(), 32);
        assert!(c.validate_chain().await.unwrap().is_valid());

        let mut bodies: Vec<String> = c.blocks().await.unwrap().into_iter().map(|b| b.body).collect();
        bodies.remove(0);
        bodies.sort();
        let mut expected: Vec<String> = (0..32).map(|i| format!("tx-{i}")).collect();
        expected.sort();
        assert_eq!(bodies, expected);
    }

    #[tokio::test]
    async fn cached_height_matches_scan() {
        let store = Arc::new(MemoryStore::new());
        let config = LedgerConfig {
            height_mode: HeightMode::Cached,
        };
        let c = Blockchain::with_config(store.clone(), &config);
        assert_eq!(c.get_block_height().await.unwrap(), -1);

        c.initialize().await.unwrap();
        for body in ["A", "B", "C"] {
            c.add_block(Block::new(body)).await.unwrap();
        }
        assert_eq!(c.get_block_height().await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 4);
        assert!(c.validate_chain().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn closed_ledger_reports_store_failure() {
        let c = chain_with(&["A"]).await;
        c.close().await.unwrap();
        assert!(matches!(
            c.get_block(0).await,
            Err(LedgerError::StoreFailure(StoreError::Closed))
        ));
    }

    fn flip_byte(path: &std::path::Path, at: u64) {
        use std::io::{Read, Seek, SeekFrom, Write};

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .unwrap();
        let mut buf = [0u8; 1];
        file.seek(SeekFrom::Start(at)).unwrap();
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(&buf).unwrap();
        file.sync_all().unwrap();
    }

    #[tokio::test]
    async fn damaged_log_cannot_be_appended_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.log");

        let frame_of_block_1 = {
            let c = Blockchain::new(Arc::new(LogStore::open(&path, SyncMode::EveryWrite).unwrap()));
            c.initialize().await.unwrap();
            let at = c.store().offset().unwrap();
            for body in ["A", "B", "C"] {
                c.add_block(Block::new(body)).await.unwrap();
            }
            c.close().await.unwrap();
            at
        };
        let len = std::fs::metadata(&path).unwrap().len();

        // One byte of block 1's payload, past the 8-byte frame header.
        flip_byte(&path, frame_of_block_1 + 8);
        assert!(matches!(
            LogStore::open(&path, SyncMode::default()),
            Err(StoreError::Corrupt { offset, .. }) if offset == frame_of_block_1
        ));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);

        // Repairing the byte brings back the untouched chain, block 3 included.
        flip_byte(&path, frame_of_block_1 + 8);
        let c = Blockchain::new(Arc::new(LogStore::open(&path, SyncMode::default()).unwrap()));
        assert_eq!(c.get_block_height().await.unwrap(), 3);
        assert_eq!(c.get_block(3).await.unwrap().body, "C");
        let next = c.add_block(Block::new("D")).await.unwrap();
        assert_eq!(next.height, 4);
        assert!(c.validate_chain().await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn chain_survives_reopen_on_log_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.log");

        let hash_at_2 = {
            let store = Arc::new(LogStore::open(&path, SyncMode::EveryWrite).unwrap());
            let c = Blockchain::new(store);
            c.initialize().await.unwrap();
            c.add_block(Block::new("A")).await.unwrap();
            let b = c.add_block(Block::new("B")).await.unwrap();
            c.close().await.unwrap();
            b.hash
        };

        let store = Arc::new(LogStore::open(&path, SyncMode::default()).unwrap());
        let c: Blockchain = Blockchain::new(store as Arc<dyn KvStore>);
        c.initialize().await.unwrap();
        assert_eq!(c.get_block_height().await.unwrap(), 2);
        let next = c.add_block(Block::new("C")).await.unwrap();
        assert_eq!(next.previous_block_hash, hash_at_2);
        assert!(c.validate_chain().await.unwrap().is_valid());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_tampered_block_is_reported(appends in 1usize..8, pick in any::<prop::sample::Index>()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let c = chain();
                c.initialize().await.unwrap();
                for i in 0..appends {
                    c.add_block(Block::new(format!("block-{i}"))).await.unwrap();
                }
                prop_assert!(c.validate_chain().await.unwrap().is_valid());

                let k = pick.index(appends) as u64;
                c.update_block(k, "X").await.unwrap();

                prop_assert!(!c.validate_block(k).await.unwrap());
                let (valid, faulty) = c.validate_chain().await.unwrap().into_parts();
                prop_assert!(!valid);
                prop_assert!(faulty.contains(&k));
                Ok(())
            })?;
        }
    }
}
