//! Chunking ("bursting") engine.
//!
//! Native mode splits a payload into consecutive particles of at most
//! `max_size` bytes, each under a fresh identifier. Manifest mode hands the
//! whole payload to the particle store under one identifier.
//!
//! Batches run with a bounded number of calls in flight. A failed call never
//! cancels its siblings; every identifier ends up in the returned status map.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use uuid::Uuid;

use ionfs_common::{StatusMap, Usage};

use crate::client::{status_for_error, ParticleResponse, ParticleStore, DELETE_TIMEOUT};

/// Largest particle the store accepts, whatever the configuration says.
pub const HARD_MAX_SIZE: usize = 65_000_000;

/// Default number of particle calls in flight per batch.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Status used when a permit could not be taken.
const STATUS_INTERNAL: u16 = 500;

/// One slice of a payload, stored as one particle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burst {
    pub id: Uuid,
    /// Inclusive start offset in the payload.
    pub start: usize,
    /// Exclusive end offset in the payload.
    pub end: usize,
    pub data: Bytes,
}

/// Clamp a configured chunk size into `1..=HARD_MAX_SIZE`.
pub fn effective_max_size(max_size: usize) -> usize {
    max_size.clamp(1, HARD_MAX_SIZE)
}

/// Number of particles a payload of `len` bytes needs.
pub fn chunk_count(len: usize, max_size: usize) -> usize {
    len.div_ceil(effective_max_size(max_size))
}

/// Split `payload` into bursts of at most `max_size` bytes.
///
/// # Postconditions
/// - `chunk_count(payload.len(), max_size)` bursts, in payload order
/// - Concatenating the bursts' data reproduces `payload`
pub fn split(payload: &Bytes, max_size: usize) -> Vec<Burst> {
    let max_size = effective_max_size(max_size);
    (0..chunk_count(payload.len(), max_size))
        .map(|i| {
            let start = i * max_size;
            let end = (start + max_size).min(payload.len());
            Burst {
                id: Uuid::new_v4(),
                start,
                end,
                data: payload.slice(start..end),
            }
        })
        .collect()
}

/// Result of a download batch.
#[derive(Debug, Clone, Default)]
pub struct Download {
    pub statuses: StatusMap,
    /// Reassembled payload, present only when every particle was fetched.
    pub data: Option<Bytes>,
}

/// Runs particle batches against one particle store.
#[derive(Clone)]
pub struct BurstEngine {
    store: Arc<dyn ParticleStore>,
    concurrency: usize,
}

impl BurstEngine {
    /// Create an engine.
    ///
    /// A `concurrency` of zero is treated as one.
    pub fn new(store: Arc<dyn ParticleStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn ParticleStore> {
        &self.store
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Upload bursts in parallel.
    pub async fn upload(
        &self,
        usage: Usage,
        bursts: Vec<Burst>,
        classification: Option<&str>,
    ) -> StatusMap {
        let semaphore = Semaphore::new(self.concurrency);
        debug!(count = bursts.len(), concurrency = self.concurrency, "Uploading bursts");

        let tasks = bursts.into_iter().map(|burst| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (burst.id, STATUS_INTERNAL);
                };
                let status = match self
                    .store
                    .put(usage, burst.id, burst.data, classification)
                    .await
                {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(id = %burst.id, error = %e, "Particle upload failed");
                        status_for_error(&e)
                    }
                };
                debug!(id = %burst.id, start = burst.start, end = burst.end, status, "PUT");
                (burst.id, status)
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// Fetch particles in parallel and reassemble them in `ids` order.
    pub async fn download(&self, usage: Usage, ids: &[Uuid]) -> Download {
        let semaphore = Semaphore::new(self.concurrency);

        let tasks = ids.iter().enumerate().map(|(index, id)| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (index, *id, ParticleResponse::status(STATUS_INTERNAL));
                };
                let response = match self.store.get(usage, *id).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Particle download failed");
                        ParticleResponse::status(status_for_error(&e))
                    }
                };
                debug!(id = %id, index, status = response.status, "GET");
                (index, *id, response)
            }
        });

        let mut results = join_all(tasks).await;
        results.sort_by_key(|(index, _, _)| *index);
        Self::reassemble(results)
    }

    fn reassemble(results: Vec<(usize, Uuid, ParticleResponse)>) -> Download {
        let statuses: StatusMap = results.iter().map(|(_, id, r)| (*id, r.status)).collect();
        if !results.iter().all(|(_, _, r)| r.is_ok()) {
            return Download {
                statuses,
                data: None,
            };
        }

        let total = results
            .iter()
            .map(|(_, _, r)| r.data.as_ref().map_or(0, |d| d.len()))
            .sum();
        let mut payload = BytesMut::with_capacity(total);
        for (_, _, response) in results {
            if let Some(data) = response.data {
                payload.extend_from_slice(&data);
            }
        }

        Download {
            statuses,
            data: Some(payload.freeze()),
        }
    }

    /// Delete particles in parallel.
    pub async fn delete(&self, usage: Usage, ids: &[Uuid]) -> StatusMap {
        let semaphore = Semaphore::new(self.concurrency);

        let tasks = ids.iter().map(|id| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (*id, STATUS_INTERNAL);
                };
                let status = match self.store.delete(usage, *id, DELETE_TIMEOUT).await {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Particle delete failed");
                        status_for_error(&e)
                    }
                };
                debug!(id = %id, status, "DELETE");
                (*id, status)
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// Upload a whole payload as one manifest.
    pub async fn upload_manifest(
        &self,
        id: Uuid,
        payload: Bytes,
        chunk_size: usize,
        classification: Option<&str>,
    ) -> StatusMap {
        let status = match self
            .store
            .put_manifest(id, payload, effective_max_size(chunk_size), classification)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!(id = %id, error = %e, "Manifest upload failed");
                status_for_error(&e)
            }
        };
        debug!(id = %id, status, "PUT manifest");
        [(id, status)].into_iter().collect()
    }

    pub async fn download_manifest(&self, id: Uuid) -> Download {
        let response = match self.store.get_manifest(id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(id = %id, error = %e, "Manifest download failed");
                ParticleResponse::status(status_for_error(&e))
            }
        };
        debug!(id = %id, status = response.status, "GET manifest");
        Self::reassemble(vec![(0, id, response)])
    }

    pub async fn delete_manifest(&self, id: Uuid) -> StatusMap {
        let status = match self.store.delete_manifest(id, DELETE_TIMEOUT).await {
            Ok(status) => status,
            Err(e) => {
                warn!(id = %id, error = %e, "Manifest delete failed");
                status_for_error(&e)
            }
        };
        [(id, status)].into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryParticleStore;
    use async_trait::async_trait;
    use ionfs_common::{Result, STATUS_OK};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// Delays reads by an amount derived from the identifier, so responses
    /// complete out of order.
    struct SlowStore(MemoryParticleStore);

    #[async_trait]
    impl ParticleStore for SlowStore {
        fn name(&self) -> &str {
            "slow"
        }

        async fn put(&self, usage: Usage, id: Uuid, data: Bytes, c: Option<&str>) -> Result<u16> {
            self.0.put(usage, id, data, c).await
        }

        async fn get(&self, usage: Usage, id: Uuid) -> Result<ParticleResponse> {
            tokio::time::sleep(Duration::from_millis(u64::from(id.as_bytes()[0] % 8))).await;
            self.0.get(usage, id).await
        }

        async fn delete(&self, usage: Usage, id: Uuid, t: Duration) -> Result<u16> {
            self.0.delete(usage, id, t).await
        }

        async fn put_manifest(&self, id: Uuid, d: Bytes, s: usize, c: Option<&str>) -> Result<u16> {
            self.0.put_manifest(id, d, s, c).await
        }

        async fn get_manifest(&self, id: Uuid) -> Result<ParticleResponse> {
            self.0.get_manifest(id).await
        }

        async fn delete_manifest(&self, id: Uuid, t: Duration) -> Result<u16> {
            self.0.delete_manifest(id, t).await
        }

        async fn classifications(&self) -> Result<BTreeMap<i32, String>> {
            self.0.classifications().await
        }
    }

    #[test]
    fn test_split_boundaries() {
        let payload = Bytes::from(vec![1u8; 25]);
        let bursts = split(&payload, 10);
        assert_eq!(bursts.len(), 3);
        assert_eq!((bursts[0].start, bursts[0].end), (0, 10));
        assert_eq!((bursts[2].start, bursts[2].end), (20, 25));
        assert_eq!(bursts[2].data.len(), 5);

        assert_eq!(split(&Bytes::from(vec![0u8; 20]), 10).len(), 2);
        assert!(split(&Bytes::new(), 10).is_empty());
    }

    #[test]
    fn test_hard_ceiling() {
        assert_eq!(effective_max_size(usize::MAX), HARD_MAX_SIZE);
        assert_eq!(effective_max_size(0), 1);
        assert_eq!(chunk_count(150_000_000, 64_000_000), 3);
        assert_eq!(chunk_count(150_000_000, 100_000_000), 3);
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let store = Arc::new(MemoryParticleStore::new());
        let engine = BurstEngine::new(store.clone(), 3);
        let payload = Bytes::from((0..100u8).collect::<Vec<_>>());
        let bursts = split(&payload, 7);
        let ids: Vec<Uuid> = bursts.iter().map(|b| b.id).collect();

        let statuses = engine.upload(Usage::Data, bursts, Some("Unclassified")).await;
        assert_eq!(statuses.len(), 15);
        assert!(statuses.all_ok());

        let download = engine.download(Usage::Data, &ids).await;
        assert!(download.statuses.all_ok());
        assert_eq!(download.data.unwrap(), payload);

        let deleted = engine.delete(Usage::Data, &ids).await;
        assert!(deleted.all_ok());
        assert_eq!(store.count(Usage::Data).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let store = Arc::new(MemoryParticleStore::new());
        let engine = BurstEngine::new(store.clone(), 2);
        let payload = Bytes::from(vec![9u8; 30]);
        let bursts = split(&payload, 10);
        let ids: Vec<Uuid> = bursts.iter().map(|b| b.id).collect();
        store.poison(ids[1], 503).unwrap();

        let statuses = engine.upload(Usage::Data, bursts, None).await;
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses.failures().count(), 1);
        assert_eq!(statuses.get(&ids[1]), Some(503));
        assert_eq!(statuses.get(&ids[0]), Some(STATUS_OK));

        let download = engine.download(Usage::Data, &ids).await;
        assert!(download.data.is_none());
        assert_eq!(download.statuses.get(&ids[1]), Some(503));
    }

    #[tokio::test]
    async fn test_manifest_round_trip() {
        let store = Arc::new(MemoryParticleStore::new());
        let engine = BurstEngine::new(store.clone(), DEFAULT_CONCURRENCY);
        let id = Uuid::new_v4();
        let payload = Bytes::from_static(b"manifest payload");

        assert!(engine.upload_manifest(id, payload.clone(), 4, None).await.all_ok());
        assert_eq!(engine.download_manifest(id).await.data.unwrap(), payload);
        assert!(engine.delete_manifest(id).await.all_ok());
        assert_eq!(engine.download_manifest(id).await.statuses.get(&id), Some(404));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_chunk_count(len in 0usize..100_000, max in 1usize..10_000) {
            let payload = Bytes::from(vec![0u8; len]);
            let bursts = split(&payload, max);
            prop_assert_eq!(bursts.len(), (len + max - 1) / max);
            prop_assert!(bursts.iter().all(|b| b.data.len() <= max));
        }

        #[test]
        fn prop_reassembly_follows_identifier_order(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            max in 8usize..64,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let payload = Bytes::from(data);
            let restored = runtime.block_on(async {
                let engine = BurstEngine::new(Arc::new(SlowStore(MemoryParticleStore::new())), 4);
                let bursts = split(&payload, max);
                let ids: Vec<Uuid> = bursts.iter().map(|b| b.id).collect();
                engine.upload(Usage::Data, bursts, None).await;
                engine.download(Usage::Data, &ids).await.data
            });
            prop_assert_eq!(restored, Some(payload));
        }
    }
}
