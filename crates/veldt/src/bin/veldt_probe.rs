//! # VELDT Probe
//!
//! Exercises a world end to end against the in-memory collaborators:
//! generates a region, prints its terrain, harvests the first node found
//! and walks a character across it.
//!
//! ```bash
//! veldt_probe                      # defaults
//! veldt_probe config/veldt.toml    # explicit config
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use veldt::{Collaborators, RequestContext, StaticTokenResolver, VeldtConfig, WorldService};
use veldt_economy::MemoryLedger;
use veldt_shared::{CharacterId, Clock, SystemClock, TerrainType, CHUNK_SIZE};
use veldt_world::{MemoryCharacterDirectory, OpContext, WorldDirectory};

/// Half-width of the probed region, in chunks.
const REGION_RADIUS: i32 = 2;

fn glyph(terrain: TerrainType) -> char {
    match terrain {
        TerrainType::Water => '~',
        TerrainType::Sand => '.',
        TerrainType::Grass => '"',
        TerrainType::Dirt => ',',
        TerrainType::Stone => '^',
    }
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match VeldtConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✗ {e}");
                std::process::exit(1);
            }
        },
        None => VeldtConfig::default(),
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                         VELDT PROBE");
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  World:    {} (seed {})", config.world.name, config.world.seed);
    println!("  Storage:  {:?}", config.storage.backend);
    println!();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let worlds = Arc::new(config.world_directory(Arc::clone(&clock)));
    let characters = Arc::new(MemoryCharacterDirectory::new());
    let identity = Arc::new(StaticTokenResolver::new());
    let ledger = Arc::new(MemoryLedger::new());

    let service = match WorldService::from_config(
        &config,
        Arc::clone(&clock),
        Collaborators {
            worlds: worlds.clone(),
            characters: characters.clone(),
            identity: identity.clone(),
            ledger: ledger.clone(),
        },
    ) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    };

    let ctx = OpContext::with_timeout(Duration::from_secs(30));

    // === REGION ===
    let started = Instant::now();
    let chunks = match service.get_chunks_in_radius(&ctx, None, 0, 0, REGION_RADIUS) {
        Ok(chunks) => chunks,
        Err(e) => {
            eprintln!("✗ region request failed: {e}");
            std::process::exit(1);
        }
    };
    println!(
        "🌍 {} chunks within radius {} in {:?}",
        chunks.len(),
        REGION_RADIUS,
        started.elapsed()
    );

    let mut terrain_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut node_counts: BTreeMap<String, usize> = BTreeMap::new();
    for chunk in &chunks {
        for cell in &chunk.cells {
            *terrain_counts.entry(cell.terrain_type().name()).or_default() += 1;
        }
        for node in &chunk.resource_nodes {
            let key = service
                .store()
                .catalog()
                .get(node.type_id)
                .map_or_else(|| format!("type {}", node.type_id), |t| t.key.clone());
            *node_counts.entry(key).or_default() += 1;
        }
    }
    println!("   Terrain: {terrain_counts:?}");
    println!("   Nodes:   {node_counts:?}");
    println!();

    // === ORIGIN CHUNK ===
    if let Some(origin) = chunks.iter().find(|c| c.chunk_x == 0 && c.chunk_y == 0) {
        println!("🗺  Chunk (0, 0):");
        for row in origin.cells.chunks(CHUNK_SIZE) {
            let line: String = row.iter().map(|c| glyph(c.terrain_type())).collect();
            println!("   {line}");
        }
        println!();
    }

    // === HARVEST ===
    let character = CharacterId(1);
    identity.grant("probe", character);
    let request = RequestContext::with_token("probe");
    let world = match worlds.default_world() {
        Ok(world) => world,
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    };

    match chunks.iter().flat_map(|c| c.resource_nodes.iter()).next() {
        Some(node) => {
            match service.harvest_resource(&ctx, &request, node.id.as_i64()) {
                Ok(response) => {
                    println!("⛏  Harvested node {} at ({}, {})", node.id, node.tile_x, node.tile_y);
                    for grant in &response.results {
                        println!("   + {} x{}", grant.item, grant.quantity);
                    }
                }
                Err(e) => println!("✗ harvest failed: {e}"),
            }
            match service.harvest_resource(&ctx, &request, node.id.as_i64()) {
                Ok(_) => println!("✗ second harvest unexpectedly succeeded"),
                Err(e) => println!("   Second harvest: {} ({})", e, e.code()),
            }
            println!("   Inventory total: {}", ledger.total_items(character));
        }
        None => println!("⛏  No resource nodes in region"),
    }
    println!();

    // === MOVEMENT ===
    characters.spawn(character, world.id, 0, 0);
    for (step, (x, y)) in [(1_i64, 0_i64), (2, 0), (3, 1)].into_iter().enumerate() {
        if step > 0 {
            std::thread::sleep(Duration::from_millis(config.movement.min_move_interval_ms));
        }
        match service.move_character(&ctx, &request, x, y) {
            Ok(response) if response.success => println!(
                "🚶 Moved to ({x}, {y}) on {}",
                response.terrain.map_or("?", TerrainType::name)
            ),
            Ok(response) => println!("🚫 Move to ({x}, {y}) rejected: {}", response.error_message),
            Err(e) => println!("✗ move failed: {e}"),
        }
    }
    match service.move_character(&ctx, &request, 4, 1) {
        Ok(response) => println!("   Immediate retry: {}", response.error_message),
        Err(e) => println!("✗ move failed: {e}"),
    }

    let stats = service.store().stats().snapshot();
    println!();
    println!("📊 {stats:?}");
}
