use proptest::prelude::*;
use strata_noise::NoiseEngine;

fn coord() -> impl Strategy<Value = f32> {
    -5000.0f32..5000.0
}

fn octaves() -> impl Strategy<Value = u32> {
    1u32..=6
}

fn persistence() -> impl Strategy<Value = f32> {
    0.1f32..0.9
}

proptest! {
    // Every single-octave sample stays inside the unit interval
    #[test]
    fn value_noise_in_unit_range(seed in any::<i32>(), x in coord(), y in coord(), z in coord()) {
        let n = NoiseEngine::new(seed);
        let a = n.value_2d(x, y);
        let b = n.value_3d(x, y, z);
        prop_assert!((0.0..=1.0).contains(&a));
        prop_assert!((0.0..=1.0).contains(&b));
    }

    // Octave sums are normalised by the amplitude sum, so stay in [0, 1] too
    #[test]
    fn octave_sums_in_unit_range(
        seed in any::<i32>(),
        x in coord(),
        y in coord(),
        z in coord(),
        oct in octaves(),
        p in persistence(),
    ) {
        let n = NoiseEngine::new(seed);
        let eps = 1e-5;
        for v in [
            n.fractal_2d(x, y, oct, p, 2.0),
            n.fractal_3d(x, y, z, oct, p, 2.0),
            n.ridged_2d(x, y, oct, p, 2.0),
            n.billow_2d(x, y, oct, p, 2.0),
        ] {
            prop_assert!(v >= -eps && v <= 1.0 + eps, "out of range: {v}");
        }
    }

    // Same seed, same output, bit for bit
    #[test]
    fn seeded_determinism(seed in any::<i32>(), x in coord(), y in coord(), z in coord()) {
        let a = NoiseEngine::new(seed);
        let b = NoiseEngine::new(seed);
        prop_assert_eq!(a.fractal_2d(x, y, 4, 0.5, 2.0).to_bits(), b.fractal_2d(x, y, 4, 0.5, 2.0).to_bits());
        prop_assert_eq!(a.value_3d(x, y, z).to_bits(), b.value_3d(x, y, z).to_bits());
        prop_assert_eq!(a.cellular_2d(x, y), b.cellular_2d(x, y));
    }

    // The nearest feature point lies in one of the 3x3 cells around the query
    #[test]
    fn cellular_point_is_nearby(seed in any::<i32>(), x in coord(), y in coord()) {
        let n = NoiseEngine::new(seed);
        let s = n.cellular_2d(x, y);
        prop_assert!((s.point[0] - x).abs() <= 2.0 + 1e-3);
        prop_assert!((s.point[1] - y).abs() <= 2.0 + 1e-3);
        let d = ((s.point[0] - x).powi(2) + (s.point[1] - y).powi(2)).sqrt();
        prop_assert!((d - s.distance).abs() <= 1e-3);
        // The query's own cell point is at most sqrt(2) away, so the nearest can't be further.
        prop_assert!(s.distance <= 2.0f32.sqrt() + 1e-3);
    }

    // Cell points stay inside their cell
    #[test]
    fn cell_point_inside_cell(seed in any::<i32>(), cx in -1000i32..1000, cy in -1000i32..1000) {
        let n = NoiseEngine::new(seed);
        let (px, py) = n.cell_point(cx, cy);
        prop_assert!(px >= cx as f32 && px <= cx as f32 + 1.0);
        prop_assert!(py >= cy as f32 && py <= cy as f32 + 1.0);
    }
}
