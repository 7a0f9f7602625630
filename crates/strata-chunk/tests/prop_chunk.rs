use proptest::prelude::*;
use strata_chunk::{Chunk, ChunkPool, ChunkState, OPEN_DENSITY};
use strata_world::voxel::layout::{density_len, material_len};
use strata_world::voxel::{ChunkCoord, DENSITY_STEP, Voxel, VoxelKind};

fn dim() -> impl Strategy<Value = usize> {
    1usize..=8
}

fn small_i32() -> impl Strategy<Value = i32> {
    -1_000_000i32..=1_000_000
}

fn kind() -> impl Strategy<Value = VoxelKind> {
    (0u8..15).prop_map(|id| VoxelKind::from_id(id).unwrap())
}

fn generated(coord: ChunkCoord, n: usize, seed: u32) -> Chunk {
    let mut c = Chunk::new(coord, n);
    let mut f = c.take_field_for_generation();
    for (i, d) in f.density.iter_mut().enumerate() {
        *d = if (i as u32).wrapping_mul(2654435761).wrapping_add(seed) % 3 == 0 {
            -0.75
        } else {
            0.5
        };
    }
    for (i, m) in f.material.iter_mut().enumerate() {
        *m = VoxelKind::from_id(((i as u32 + seed) % 15) as u8).unwrap();
    }
    c.install_field(f);
    c
}

#[test]
fn pooled_chunk_reports_zero_data_for_new_coordinate() {
    let n = 8;
    let mut pool = ChunkPool::new(4);
    let mut a = generated(ChunkCoord::new(1, 2, 0), n, 7);
    a.neighbors = [Some(ChunkCoord::new(2, 2, 0)); 6];
    a.lod = 3;
    a.collision = true;
    a.mark_built();
    assert!(pool.release(a));

    let mut b = pool.acquire(ChunkCoord::new(-5, 9, 1), n);
    assert_eq!(b.coord, ChunkCoord::new(-5, 9, 1));
    assert_eq!(b.state, ChunkState::Unloaded);
    assert_eq!(b.neighbors, [None; 6]);
    assert_eq!(b.lod, 0);
    assert!(!b.collision);
    assert!(b.occupancy.is_none());
    assert!(!b.has_field());

    // Prior to regeneration the field handed to the generator is all zero / air.
    let field = b.take_field_for_generation();
    assert_eq!(field.density.len(), density_len(n));
    assert_eq!(field.material.len(), material_len(n));
    assert!(field.density.iter().all(|d| *d == 0.0));
    assert!(field.material.iter().all(|m| *m == VoxelKind::Air));
    assert!(field.density.capacity() >= density_len(n));

    let stats = pool.stats();
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.pooled, 0);
}

#[test]
fn full_pool_drops_chunks() {
    let mut pool = ChunkPool::new(1);
    assert!(pool.release(Chunk::new(ChunkCoord::new(0, 0, 0), 8)));
    assert!(!pool.release(Chunk::new(ChunkCoord::new(1, 0, 0), 8)));
    let s = pool.stats();
    assert_eq!(s.pooled, 1);
    assert_eq!(s.dropped, 1);
    assert_eq!(pool.clear(), 1);
    assert!(pool.is_empty());
}

#[test]
fn zero_capacity_pool_never_keeps_anything() {
    let mut pool = ChunkPool::new(0);
    assert!(!pool.release(Chunk::new(ChunkCoord::new(0, 0, 0), 8)));
    let c = pool.acquire(ChunkCoord::new(3, 3, 3), 8);
    assert_eq!(c.coord, ChunkCoord::new(3, 3, 3));
    assert_eq!(pool.stats().created, 1);
}

proptest! {
    // Density reads are open outside [0, n] on any axis and stored values inside
    #[test]
    fn density_bounds(cx in small_i32(), cy in small_i32(), n in dim(), x in -3i32..12, y in -3i32..12, z in -3i32..12) {
        let c = generated(ChunkCoord::new(cx, cy, 0), n, 3);
        let inside = (0..=n as i32).contains(&x) && (0..=n as i32).contains(&y) && (0..=n as i32).contains(&z);
        let d = c.density(x, y, z);
        if inside {
            prop_assert!(d == -0.75 || d == 0.5);
        } else {
            prop_assert_eq!(d, OPEN_DENSITY);
        }
    }

    // Material reads are air outside [0, n)
    #[test]
    fn material_bounds(n in dim(), x in -3i32..12, y in -3i32..12, z in -3i32..12) {
        let c = generated(ChunkCoord::new(0, 0, 0), n, 11);
        let inside = (0..n as i32).contains(&x) && (0..n as i32).contains(&y) && (0..n as i32).contains(&z);
        if !inside {
            prop_assert_eq!(c.material(x, y, z), VoxelKind::Air);
        }
    }

    // set_voxel then voxel reproduces the kind exactly and the density within one byte step
    #[test]
    fn voxel_round_trip(n in 2usize..=8, k in kind(), density in any::<u8>(), x in 0i32..8, y in 0i32..8, z in 0i32..8) {
        prop_assume!(x < n as i32 && y < n as i32 && z < n as i32);
        let mut c = generated(ChunkCoord::new(0, 0, 0), n, 5);
        let v = Voxel::new(k, density);
        c.set_voxel(x, y, z, v);
        let back = c.voxel(x, y, z);
        prop_assert_eq!(back.kind, k);
        prop_assert!((back.field_density() - v.field_density()).abs() <= DENSITY_STEP);
    }

    // Sculpting never leaves [-1, 1] and only touches corners inside the radius
    #[test]
    fn sculpt_stays_clamped(
        n in 4usize..=8,
        px in 0.0f32..800.0,
        py in 0.0f32..800.0,
        pz in 0.0f32..800.0,
        radius in 10.0f32..400.0,
        strength in 0.0f32..3.0,
        add in any::<bool>(),
    ) {
        let mut c = generated(ChunkCoord::new(0, 0, 0), n, 9);
        let changed = c.modify_density([px, py, pz], radius, strength, add, 100.0);
        for [x, y, z] in &changed {
            let d = c.density(*x, *y, *z);
            prop_assert!((-1.0..=1.0).contains(&d));
            let dx = *x as f32 * 100.0 - px;
            let dy = *y as f32 * 100.0 - py;
            let dz = *z as f32 * 100.0 - pz;
            prop_assert!((dx * dx + dy * dy + dz * dz).sqrt() <= radius + 1e-3);
        }
    }
}
