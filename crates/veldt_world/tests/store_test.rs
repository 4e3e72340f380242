//! # Chunk Store Integration Tests
//!
//! Single generation under contention, range and radius shape, and
//! insert-if-absent across repositories sharing one directory.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use veldt_procedural::{ChunkCoord, GeneratorConfig, WorldSeed};
use veldt_shared::{Clock, ManualClock, ResourceCatalog, Timestamp, WorldId};
use veldt_world::{
    ChunkRepository, ChunkStore, FileRepository, MemoryRepository, OpContext, StoreConfig, World,
    WorldError,
};

fn world() -> World {
    World {
        id: WorldId::new(1).unwrap(),
        name: "Veldt".to_string(),
        seed: WorldSeed::new(12345),
        created_at: Timestamp::ZERO,
    }
}

fn store_over(repo: Arc<dyn ChunkRepository>, clock: Arc<dyn Clock>) -> ChunkStore {
    ChunkStore::new(
        repo,
        Arc::new(ResourceCatalog::builtin()),
        GeneratorConfig::default(),
        StoreConfig::default(),
        clock,
    )
}

fn memory_store() -> ChunkStore {
    store_over(
        Arc::new(MemoryRepository::new()),
        Arc::new(ManualClock::new(Timestamp(1_000))),
    )
}

fn temp_root(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("veldt_{name}_{nanos}"))
}

/// Test: many concurrent callers for one missing chunk cause exactly one
/// generation, and all receive the same chunk.
#[test]
fn test_concurrent_get_or_create_generates_once() {
    const THREADS: usize = 16;
    let store = Arc::new(memory_store());
    let barrier = Arc::new(Barrier::new(THREADS));
    let coord = ChunkCoord::new(10, 20);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.get_or_create(&OpContext::background(), &world(), coord).unwrap()
            })
        })
        .collect();

    let chunks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for chunk in &chunks {
        assert_eq!(**chunk, *chunks[0]);
    }

    let stats = store.stats().snapshot();
    println!("Contended get_or_create: {stats:?}");
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.conflicts, 0);
}

/// Test: a range is complete, duplicate-free and inside the rectangle.
#[test]
fn test_range_is_complete() {
    let store = memory_store();
    let chunks = store
        .get_range(&OpContext::background(), &world(), -2, 2, -1, 1)
        .unwrap();

    assert_eq!(chunks.len(), 15);
    let coords: HashSet<ChunkCoord> = chunks.iter().map(|c| c.coord()).collect();
    assert_eq!(coords.len(), 15);
    for coord in &coords {
        assert!((-2..=2).contains(&coord.x) && (-1..=1).contains(&coord.y));
    }
    assert_eq!(store.stats().snapshot().generated, 15);
}

/// Test: overlapping ranges share chunks instead of regenerating them.
#[test]
fn test_overlapping_ranges_reuse_chunks() {
    let store = memory_store();
    let ctx = OpContext::background();
    let first = store.get_range(&ctx, &world(), 0, 3, 0, 3).unwrap();
    let second = store.get_range(&ctx, &world(), 2, 5, 2, 5).unwrap();
    assert_eq!(first.len(), 16);
    assert_eq!(second.len(), 16);
    assert_eq!(store.stats().snapshot().generated, 16 + 16 - 4);
}

/// Test: radius inclusion uses the Euclidean boundary.
#[test]
fn test_radius_boundary() {
    let store = memory_store();
    let chunks = store
        .get_radius(&OpContext::background(), &world(), 5, -5, 3)
        .unwrap();
    let offsets: HashSet<(i32, i32)> = chunks
        .iter()
        .map(|c| (c.chunk_x - 5, c.chunk_y + 5))
        .collect();

    assert_eq!(chunks.len(), 29);
    assert_eq!(offsets.len(), 29);
    assert!(offsets.contains(&(3, 0)));
    assert!(offsets.contains(&(2, 2)));
    assert!(!offsets.contains(&(3, 1)));
    assert!(!offsets.contains(&(3, 3)));
}

/// Test: an expired request stores nothing.
#[test]
fn test_expired_range_persists_nothing() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), Arc::new(ManualClock::new(Timestamp(1))));
    let ctx = OpContext::background().with_deadline(Instant::now());

    let result = store.get_range(&ctx, &world(), 0, 4, 0, 4);
    assert_eq!(result, Err(WorldError::DeadlineExceeded));
    assert_eq!(repo.chunk_count(), 0);
}

/// Test: two stores over separate repository instances sharing one
/// directory agree on every chunk, and only one of them stores each.
#[test]
fn test_file_repositories_share_chunks() {
    const THREADS: usize = 8;
    let root = temp_root("shared_store");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Timestamp(7)));
    let stores = [
        Arc::new(store_over(Arc::new(FileRepository::open(&root).unwrap()), Arc::clone(&clock))),
        Arc::new(store_over(Arc::new(FileRepository::open(&root).unwrap()), Arc::clone(&clock))),
    ];
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let store = Arc::clone(&stores[i % 2]);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .get_range(&OpContext::background(), &world(), 0, 2, 0, 2)
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for chunks in &results {
        assert_eq!(chunks, &results[0]);
    }

    let generated: u64 = stores.iter().map(|s| s.stats().snapshot().generated).sum();
    assert_eq!(generated, 9);

    // A third instance opened later sees the same chunks.
    let late = store_over(Arc::new(FileRepository::open(&root).unwrap()), clock);
    let reread = late
        .get_range(&OpContext::background(), &world(), 0, 2, 0, 2)
        .unwrap();
    assert_eq!(reread, results[0]);
    assert_eq!(late.stats().snapshot().generated, 0);

    std::fs::remove_dir_all(&root).ok();
}
