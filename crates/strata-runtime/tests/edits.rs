mod common;

use std::sync::Arc;

use proptest::prelude::*;
use strata_geom::Vec3;
use strata_runtime::ChunkStore;
use strata_world::{MeshingMode, WorldConfig};
use strata_world::voxel::{ChunkCoord, DENSITY_STEP, Voxel, VoxelKind};

use common::{FlatTerrain, run_until_idle, small_config};

/// 16-voxel chunks of 100 units, one layer, radius 1 around the origin chunk.
fn sculpt_config() -> WorldConfig {
    let mut cfg = small_config(false);
    cfg.world.chunk_size = 16;
    cfg.world.render_distance = 1;
    cfg.world.height_chunks = 1;
    cfg
}

fn loaded_store(cfg: &WorldConfig) -> ChunkStore {
    let mut store = ChunkStore::new(cfg, Some(Arc::new(FlatTerrain::at(5))));
    store.set_load_center(Vec3::new(50.0, 50.0, 500.0));
    run_until_idle(&mut store);
    store.take_mesh_events();
    store
}

fn dirty(store: &ChunkStore) -> Vec<ChunkCoord> {
    let mut out: Vec<ChunkCoord> = store.chunks().filter(|c| c.is_dirty()).map(|c| c.coord).collect();
    out.sort_unstable_by_key(|c| (c.cz, c.cy, c.cx));
    out
}

#[test]
fn world_positions_split_into_chunk_and_local_voxel() {
    let store = loaded_store(&sculpt_config());
    assert_eq!(store.world_to_voxel(Vec3::new(-50.0, 0.0, 1599.0)), [-1, 0, 15]);
    assert_eq!(
        store.world_to_local_voxel(Vec3::new(-50.0, 1650.0, 0.0)),
        (ChunkCoord::new(-1, 1, 0), [15, 0, 0])
    );
    assert_eq!(store.world_to_chunk_coord(Vec3::new(3200.0, -1.0, 0.0)), ChunkCoord::new(2, -1, 0));
}

#[test]
fn sculpt_inside_one_chunk_dirties_only_that_chunk() {
    let cfg = sculpt_config();
    let mut store = loaded_store(&cfg);
    // Voxel (8, 8, 10): open air well away from every chunk face.
    let touched = store.modify_density(Vec3::new(850.0, 850.0, 1050.0), 300.0, 0.5, true);
    assert_eq!(touched, vec![ChunkCoord::new(0, 0, 0)]);
    assert_eq!(dirty(&store), vec![ChunkCoord::new(0, 0, 0)]);
    let center = store.chunk(ChunkCoord::new(0, 0, 0)).unwrap();
    assert!(center.density(8, 8, 10) < 1.0);
    assert_eq!(center.density(8, 8, 14), 1.0);
}

#[test]
fn sculpt_across_a_face_dirties_exactly_the_sharing_neighbour() {
    let cfg = sculpt_config();
    let mut store = loaded_store(&cfg);
    // Voxel x = 16.1 sits just inside chunk (1, 0, 0); its sphere reaches back to x = 14.
    let mut touched = store.modify_density(Vec3::new(1610.0, 850.0, 1050.0), 300.0, 0.5, true);
    touched.sort_unstable_by_key(|c| (c.cz, c.cy, c.cx));
    let expected = vec![ChunkCoord::new(0, 0, 0), ChunkCoord::new(1, 0, 0)];
    assert_eq!(touched, expected);
    assert_eq!(dirty(&store), expected);

    // The shared boundary sample holds the same value on both sides.
    let a = store.chunk(ChunkCoord::new(0, 0, 0)).unwrap().density(16, 8, 10);
    let b = store.chunk(ChunkCoord::new(1, 0, 0)).unwrap().density(0, 8, 10);
    assert!(a < 1.0);
    assert_eq!(a, b);
}

#[test]
fn sculpting_solid_then_back_switches_materials() {
    let cfg = sculpt_config();
    let mut store = loaded_store(&cfg);
    let p = Vec3::new(850.0, 850.0, 1050.0);
    assert_eq!(store.get_voxel(p).kind, VoxelKind::Air);
    for _ in 0..3 {
        store.modify_density(p, 300.0, 1.0, true);
    }
    let filled = store.get_voxel(p);
    assert_eq!(filled.kind, VoxelKind::Dirt);
    assert!(filled.field_density() <= 0.0);
    for _ in 0..3 {
        store.modify_density(p, 300.0, 1.0, false);
    }
    assert_eq!(store.get_voxel(p).kind, VoxelKind::Air);
    // Sculpted chunks rebuild on the next drain.
    assert_eq!(store.drain_mesh_queue(64), 1);
}

#[test]
fn sculpt_ignores_degenerate_input() {
    let mut store = loaded_store(&sculpt_config());
    assert!(store.modify_density(Vec3::new(850.0, 850.0, 1050.0), 0.0, 1.0, true).is_empty());
    assert!(store.modify_density(Vec3::new(f32::NAN, 0.0, 0.0), 300.0, 1.0, true).is_empty());
    // Nothing loaded out here.
    assert!(store.modify_density(Vec3::new(1.0e6, 0.0, 500.0), 300.0, 1.0, true).is_empty());
    assert!(dirty(&store).is_empty());
}

#[test]
fn set_voxel_on_a_face_dirties_the_neighbour_across_it() {
    let mut store = loaded_store(&sculpt_config());
    // Interior voxel: only the owner.
    assert!(store.place_voxel(Vec3::new(450.0, 450.0, 950.0), VoxelKind::Clay));
    assert_eq!(dirty(&store), vec![ChunkCoord::new(0, 0, 0)]);
    store.drain_mesh_queue(64);
    assert!(dirty(&store).is_empty());

    // Local x = 0 of chunk (0, 0, 0): the -X neighbour shares that corner and face.
    assert!(store.place_voxel(Vec3::new(50.0, 450.0, 950.0), VoxelKind::Clay));
    assert_eq!(dirty(&store), vec![ChunkCoord::new(-1, 0, 0), ChunkCoord::new(0, 0, 0)]);
    let shared = store.chunk(ChunkCoord::new(-1, 0, 0)).unwrap().density(16, 4, 9);
    assert_eq!(shared, -1.0);
    store.drain_mesh_queue(64);

    // Local x = 15: the +X neighbour's face borders it even though no corner is shared.
    assert!(store.destroy_voxel(Vec3::new(1550.0, 450.0, 450.0)));
    assert_eq!(dirty(&store), vec![ChunkCoord::new(0, 0, 0), ChunkCoord::new(1, 0, 0)]);
}

#[test]
fn set_voxel_outside_loaded_chunks_is_refused() {
    let mut store = loaded_store(&sculpt_config());
    assert!(!store.place_voxel(Vec3::new(1.0e6, 0.0, 100.0), VoxelKind::Stone));
    assert_eq!(store.get_voxel(Vec3::new(1.0e6, 0.0, 100.0)), Voxel::AIR);
    // Writing what is already there changes nothing.
    assert!(!store.place_voxel(Vec3::new(450.0, 450.0, 50.0), VoxelKind::Stone));
    assert!(dirty(&store).is_empty());
}

#[test]
fn raycast_down_hits_the_top_face() {
    let mut store = loaded_store(&sculpt_config());
    let hit = store
        .raycast(Vec3::new(0.0, 0.0, 2000.0), Vec3::new(0.0, 0.0, -2000.0))
        .expect("ground below");
    assert_eq!(hit.cell, [0, 0, 5]);
    assert_eq!(hit.normal, Vec3::new(0.0, 0.0, 1.0));
    assert_eq!(hit.voxel.kind, VoxelKind::Stone);
    assert!((hit.position.z - 600.0).abs() < 1e-2);

    assert!(store.destroy_voxel(Vec3::new(50.0, 50.0, 550.0)));
    let hit = store
        .raycast(Vec3::new(50.0, 50.0, 2000.0), Vec3::new(50.0, 50.0, -2000.0))
        .unwrap();
    assert_eq!(hit.cell, [0, 0, 4]);
    assert!((hit.position.z - 500.0).abs() < 1e-2);

    assert!(store.raycast(Vec3::new(0.0, 0.0, 2000.0), Vec3::new(0.0, 0.0, 900.0)).is_none());
}

#[test]
fn blocky_mode_meshes_a_block_placed_in_open_sky() {
    let mut cfg = small_config(false);
    cfg.meshing.mode = MeshingMode::Blocky;
    let mut store = loaded_store(&cfg);
    let sky = ChunkCoord::new(0, 0, 1);
    assert!(store.mesh(sky).unwrap().buffer.is_empty());

    // Solid material over an open density byte.
    assert!(store.set_voxel(Vec3::new(350.0, 350.0, 1250.0), Voxel::new(VoxelKind::Stone, 0)));
    assert_eq!(dirty(&store), vec![sky]);
    store.drain_mesh_queue(64);
    let mesh = store.mesh(sky).unwrap();
    assert_eq!(mesh.buffer.triangle_count(), 12);
}

/// A point inside one of the five loaded chunks of the radius-1 disc.
fn loaded_point() -> impl Strategy<Value = Vec3> {
    (0usize..5, 0.0f32..1599.0, 0.0f32..1599.0, 0.0f32..1599.0).prop_map(|(column, x, y, z)| {
        let (cx, cy) = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)][column];
        Vec3::new(cx as f32 * 1600.0 + x, cy as f32 * 1600.0 + y, z)
    })
}

fn kind() -> impl Strategy<Value = VoxelKind> {
    proptest::sample::select(VoxelKind::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Kind survives exactly; density within one quantisation step
    #[test]
    fn set_then_get_round_trips(p in loaded_point(), k in kind(), density in any::<u8>()) {
        let mut store = loaded_store(&sculpt_config());
        let v = Voxel::new(k, density);
        store.set_voxel(p, v);
        let back = store.get_voxel(p);
        prop_assert_eq!(back.kind, k);
        prop_assert!((back.field_density() - v.field_density()).abs() <= DENSITY_STEP);
    }
}
