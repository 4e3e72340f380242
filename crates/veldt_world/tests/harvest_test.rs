//! # Harvest Integration Tests
//!
//! Exactly-once harvesting under contention, within one store and across
//! stores sharing a file repository, plus respawn.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use veldt_economy::MemoryLedger;
use veldt_procedural::{ChunkCoord, GeneratorConfig, WorldSeed};
use veldt_shared::{CharacterId, Clock, ManualClock, ResourceCatalog, Timestamp, WorldId};
use veldt_world::{
    ChunkRepository, ChunkStore, FileRepository, MemoryRepository, NodeState, OpContext,
    ResourceNode, ResourceNodeLifecycle, StoreConfig, World, WorldError,
};

fn world() -> World {
    World {
        id: WorldId::new(1).unwrap(),
        name: "Veldt".to_string(),
        seed: WorldSeed::new(12345),
        created_at: Timestamp::ZERO,
    }
}

fn store_over(repo: Arc<dyn ChunkRepository>, clock: Arc<dyn Clock>) -> Arc<ChunkStore> {
    Arc::new(ChunkStore::new(
        repo,
        Arc::new(ResourceCatalog::builtin()),
        GeneratorConfig::default(),
        StoreConfig::default(),
        clock,
    ))
}

fn first_node(store: &ChunkStore) -> ResourceNode {
    let chunks = store
        .get_range(&OpContext::background(), &world(), 0, 7, 0, 0)
        .unwrap();
    chunks
        .iter()
        .find_map(|c| c.resource_nodes.first().copied())
        .expect("no resource node in the first eight chunks")
}

fn temp_root(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("veldt_{name}_{nanos}"))
}

/// Test: K concurrent harvests of one node give one success, K-1
/// unavailable, and one harvest's worth of items.
#[test]
fn test_concurrent_harvest_single_winner() {
    const THREADS: usize = 12;
    let clock = Arc::new(ManualClock::new(Timestamp(50_000)));
    let store = store_over(Arc::new(MemoryRepository::new()), clock);
    let ledger = Arc::new(MemoryLedger::new());
    let lifecycle = Arc::new(ResourceNodeLifecycle::new(Arc::clone(&store), ledger.clone()));
    let node = first_node(&store);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let lifecycle = Arc::clone(&lifecycle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lifecycle.harvest(&OpContext::background(), &world(), node.id, CharacterId(i as u64 + 1))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(e) = result {
            assert_eq!(*e, WorldError::NodeUnavailable(node.id));
        }
    }

    let report = winners[0];
    let granted: u64 = report.grants.iter().map(|g| u64::from(g.quantity)).sum();
    let held: u64 = (1..=THREADS as u64).map(|c| ledger.total_items(CharacterId(c))).sum();
    assert_eq!(held, granted);
}

/// Test: a depleted node shows as depleted in served chunks until its
/// respawn time, then becomes harvestable again with a fresh roll.
#[test]
fn test_respawn_cycle() {
    let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
    let store = store_over(Arc::new(MemoryRepository::new()), Arc::clone(&clock) as Arc<dyn Clock>);
    let lifecycle = ResourceNodeLifecycle::new(Arc::clone(&store), Arc::new(MemoryLedger::new()));
    let node = first_node(&store);
    let ctx = OpContext::background();
    let character = CharacterId(9);

    let report = lifecycle.harvest(&ctx, &world(), node.id, character).unwrap();
    let coord = ChunkCoord::new(node.id.decode().unwrap().0, node.id.decode().unwrap().1);
    let served = store.get_or_create(&ctx, &world(), coord).unwrap();
    assert_eq!(
        served.node(node.id).unwrap().state,
        NodeState::Depleted {
            respawn_ready_at: report.respawn_ready_at
        }
    );

    clock.set(Timestamp(report.respawn_ready_at.as_millis() - 1));
    assert_eq!(
        lifecycle.harvest(&ctx, &world(), node.id, character),
        Err(WorldError::NodeUnavailable(node.id))
    );

    clock.advance(Duration::from_millis(1));
    let served = store.get_or_create(&ctx, &world(), coord).unwrap();
    assert_eq!(served.node(node.id).unwrap().state, NodeState::Available);
    assert!(lifecycle.harvest(&ctx, &world(), node.id, character).is_ok());
}

/// Test: harvests through two stores over one directory still have a
/// single winner.
#[test]
fn test_harvest_across_file_repositories() {
    let root = temp_root("shared_harvest");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Timestamp(3_000)));
    let ledger = Arc::new(MemoryLedger::new());
    let lifecycles: Vec<Arc<ResourceNodeLifecycle>> = (0..2)
        .map(|_| {
            let store = store_over(Arc::new(FileRepository::open(&root).unwrap()), Arc::clone(&clock));
            Arc::new(ResourceNodeLifecycle::new(store, ledger.clone()))
        })
        .collect();

    let observer = store_over(Arc::new(FileRepository::open(&root).unwrap()), Arc::clone(&clock));
    let node = first_node(&observer);
    let barrier = Arc::new(Barrier::new(lifecycles.len() * 3));

    let handles: Vec<_> = (0..lifecycles.len() * 3)
        .map(|i| {
            let lifecycle = Arc::clone(&lifecycles[i % lifecycles.len()]);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lifecycle.harvest(&OpContext::background(), &world(), node.id, CharacterId(1))
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(wins, 1);

    let record = observer.repository().node_state(world().id, node.id).unwrap();
    assert_eq!(record.version, 1);
    std::fs::remove_dir_all(&root).ok();
}

/// Test: repeated harvest and respawn cycles on a file repository leave at
/// most two state records per node.
#[test]
fn test_file_node_history_stays_bounded() {
    let root = temp_root("node_history");
    let clock = Arc::new(ManualClock::new(Timestamp(10_000)));
    let store = store_over(
        Arc::new(FileRepository::open(&root).unwrap()),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    let lifecycle = ResourceNodeLifecycle::new(Arc::clone(&store), Arc::new(MemoryLedger::new()));
    let node = first_node(&store);
    let ctx = OpContext::background();
    let node_dir = root
        .join("nodes")
        .join(world().id.to_string())
        .join(node.id.to_string());

    for cycle in 1..=6_u64 {
        let report = lifecycle.harvest(&ctx, &world(), node.id, CharacterId(4)).unwrap();
        clock.set(report.respawn_ready_at);

        let files = std::fs::read_dir(&node_dir).unwrap().count();
        assert!(files <= 2, "cycle {cycle}: {files} state records");
        assert_eq!(store.repository().node_state(world().id, node.id).unwrap().version, cycle);
    }
    std::fs::remove_dir_all(&root).ok();
}
