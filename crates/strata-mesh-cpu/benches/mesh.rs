use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use strata_chunk::Chunk;
use strata_mesh_cpu::{ChunkMesher, MeshOptions, SourceSampler};
use strata_world::field::TerrainSource;
use strata_world::voxel::ChunkCoord;
use strata_world::{FieldGenerator, MeshingMode, WorldConfig};

fn surface_chunk(cfg: &WorldConfig, g: &FieldGenerator) -> Chunk {
    let n = cfg.chunk_size();
    let h = g.terrain_height(0, 0) as i32;
    let mut c = Chunk::new(ChunkCoord::from_voxel(0, 0, h, n), n);
    let mut f = c.take_field_for_generation();
    g.fill_chunk(c.origin(), n, &mut f.density, &mut f.material, &|| false);
    c.install_field(f);
    c
}

fn bench_meshers(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_surface_chunk");
    group.measurement_time(Duration::from_secs(5));
    let cfg = WorldConfig::default();
    let g = FieldGenerator::new(&cfg);
    let mut chunk = surface_chunk(&cfg, &g);
    let outside = SourceSampler {
        source: &g,
        origin: chunk.origin(),
    };

    for (name, mode, dedup) in [
        ("smooth_dedup", MeshingMode::Smooth, true),
        ("smooth_raw", MeshingMode::Smooth, false),
        ("blocky", MeshingMode::Blocky, false),
    ] {
        let mut mesher = ChunkMesher::new(MeshOptions {
            mode,
            voxel_size: cfg.world.voxel_size,
            dedup,
            skip_empty: false,
        });
        group.bench_function(name, |b| {
            b.iter(|| black_box(mesher.build(&chunk, &outside)));
        });
    }

    for lod in 1..=3u8 {
        chunk.lod = lod;
        let mut mesher = ChunkMesher::new(MeshOptions::from_config(&cfg));
        group.bench_function(format!("smooth_lod{lod}"), |b| {
            b.iter(|| black_box(mesher.build(&chunk, &outside)));
        });
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let cfg = WorldConfig::default();
    let g = FieldGenerator::new(&cfg);
    c.bench_function("fill_surface_chunk", |b| {
        b.iter(|| black_box(surface_chunk(&cfg, &g)));
    });
}

criterion_group!(benches, bench_meshers, bench_generate);
criterion_main!(benches);
