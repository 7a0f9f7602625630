//! Seeded gradient noise: value, fractal, ridged, billow and cellular variants.
//!
//! Everything is a pure function of the seed. The only state is a 512-entry permutation table
//! (0..=255 shuffled once, then duplicated) so hashed lookups can index `p[p[x] + y]` without wrapping.
#![forbid(unsafe_code)]

const GRAD3: [[f32; 3]; 16] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [0.0, -1.0, 1.0],
    [0.0, -1.0, -1.0],
];

/// Nearest seed point returned by [`NoiseEngine::cellular_2d`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSample {
    pub distance: f32,
    pub point: [f32; 2],
}

#[derive(Clone, Debug)]
pub struct NoiseEngine {
    seed: i32,
    perm: Box<[u8; 512]>,
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[inline]
fn grad2(hash: u8, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    let u = if h & 1 != 0 { -u } else { u };
    let v = if h & 2 != 0 { -2.0 * v } else { 2.0 * v };
    u + v
}

#[inline]
fn grad3(hash: u8, x: f32, y: f32, z: f32) -> f32 {
    let g = GRAD3[(hash & 15) as usize];
    g[0] * x + g[1] * y + g[2] * z
}

#[inline]
fn to_unit(r: f32) -> f32 {
    ((r + 1.0) * 0.5).clamp(0.0, 1.0)
}

impl NoiseEngine {
    pub fn new(seed: i32) -> Self {
        let mut base = [0u8; 256];
        for (i, v) in base.iter_mut().enumerate() {
            *v = i as u8;
        }
        let mut rng = fastrand::Rng::with_seed(seed as u32 as u64);
        for i in (1..256usize).rev() {
            let j = rng.usize(0..=i);
            base.swap(i, j);
        }
        let mut perm = Box::new([0u8; 512]);
        perm[..256].copy_from_slice(&base);
        perm[256..].copy_from_slice(&base);
        Self { seed, perm }
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// Raw permutation entry. `i` wraps at 512.
    #[inline]
    pub fn perm(&self, i: usize) -> u8 {
        self.perm[i & 511]
    }

    #[inline]
    fn p(&self, i: usize) -> usize {
        self.perm[i] as usize
    }

    /// Single-octave gradient noise remapped to `[0, 1]`.
    pub fn value_2d(&self, x: f32, y: f32) -> f32 {
        let fx = x.floor();
        let fy = y.floor();
        let x0 = (fx as i32 & 255) as usize;
        let y0 = (fy as i32 & 255) as usize;
        let x1 = (x0 + 1) & 255;
        let y1 = (y0 + 1) & 255;
        let xf = x - fx;
        let yf = y - fy;
        let u = fade(xf);
        let v = fade(yf);

        let aa = self.perm[self.p(x0) + y0];
        let ab = self.perm[self.p(x0) + y1];
        let ba = self.perm[self.p(x1) + y0];
        let bb = self.perm[self.p(x1) + y1];

        let r = lerp(
            lerp(grad2(aa, xf, yf), grad2(ba, xf - 1.0, yf), u),
            lerp(grad2(ab, xf, yf - 1.0), grad2(bb, xf - 1.0, yf - 1.0), u),
            v,
        );
        to_unit(r)
    }

    /// Single-octave 3D gradient noise remapped to `[0, 1]`.
    pub fn value_3d(&self, x: f32, y: f32, z: f32) -> f32 {
        let fx = x.floor();
        let fy = y.floor();
        let fz = z.floor();
        let x0 = (fx as i32 & 255) as usize;
        let y0 = (fy as i32 & 255) as usize;
        let z0 = (fz as i32 & 255) as usize;
        let x1 = (x0 + 1) & 255;
        let xf = x - fx;
        let yf = y - fy;
        let zf = z - fz;
        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let a = self.p(x0) + y0;
        let aa = self.p(a) + z0;
        let ab = self.p(a + 1) + z0;
        let b = self.p(x1) + y0;
        let ba = self.p(b) + z0;
        let bb = self.p(b + 1) + z0;

        let g = |i: usize, dx: f32, dy: f32, dz: f32| grad3(self.perm[i], dx, dy, dz);
        let r = lerp(
            lerp(
                lerp(g(aa, xf, yf, zf), g(ba, xf - 1.0, yf, zf), u),
                lerp(g(ab, xf, yf - 1.0, zf), g(bb, xf - 1.0, yf - 1.0, zf), u),
                v,
            ),
            lerp(
                lerp(
                    g(aa + 1, xf, yf, zf - 1.0),
                    g(ba + 1, xf - 1.0, yf, zf - 1.0),
                    u,
                ),
                lerp(
                    g(ab + 1, xf, yf - 1.0, zf - 1.0),
                    g(bb + 1, xf - 1.0, yf - 1.0, zf - 1.0),
                    u,
                ),
                v,
            ),
            w,
        );
        to_unit(r)
    }

    fn octaves_2d(
        &self,
        x: f32,
        y: f32,
        octaves: u32,
        persistence: f32,
        lacunarity: f32,
        shape: impl Fn(f32) -> f32,
    ) -> f32 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max = 0.0;
        for _ in 0..octaves.max(1) {
            total += shape(self.value_2d(x * frequency, y * frequency)) * amplitude;
            max += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }
        if max > 0.0 { total / max } else { 0.0 }
    }

    /// Octave sum normalised by the total amplitude, in `[0, 1]`.
    pub fn fractal_2d(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        self.octaves_2d(x, y, octaves, persistence, lacunarity, |v| v)
    }

    pub fn fractal_3d(
        &self,
        x: f32,
        y: f32,
        z: f32,
        octaves: u32,
        persistence: f32,
        lacunarity: f32,
    ) -> f32 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max = 0.0;
        for _ in 0..octaves.max(1) {
            total += self.value_3d(x * frequency, y * frequency, z * frequency) * amplitude;
            max += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }
        if max > 0.0 { total / max } else { 0.0 }
    }

    /// Ridge lines: each octave is folded to `(1 - |2v - 1|)^2`.
    pub fn ridged_2d(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        self.octaves_2d(x, y, octaves, persistence, lacunarity, |v| {
            let r = 1.0 - (v * 2.0 - 1.0).abs();
            r * r
        })
    }

    /// Rounded humps: each octave is folded to `|2v - 1|`.
    pub fn billow_2d(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        self.octaves_2d(x, y, octaves, persistence, lacunarity, |v| (v * 2.0 - 1.0).abs())
    }

    /// Distance to the nearest feature point over the 3x3 block of integer cells around `(x, y)`.
    /// Each cell holds exactly one point, placed by hashing the cell through the permutation table.
    pub fn cellular_2d(&self, x: f32, y: f32) -> CellSample {
        let cx = x.floor() as i32;
        let cy = y.floor() as i32;
        let mut best = f32::MAX;
        let mut point = [0.0f32; 2];
        for oy in -1..=1 {
            for ox in -1..=1 {
                let nx = cx + ox;
                let ny = cy + oy;
                let (px, py) = self.cell_point(nx, ny);
                let d = (x - px) * (x - px) + (y - py) * (y - py);
                if d < best {
                    best = d;
                    point = [px, py];
                }
            }
        }
        CellSample {
            distance: best.sqrt(),
            point,
        }
    }

    /// Feature point of integer cell `(cx, cy)`; always inside `[cx, cx+1] x [cy, cy+1]`.
    pub fn cell_point(&self, cx: i32, cy: i32) -> (f32, f32) {
        let h = self.p(((self.p((cx & 255) as usize) as i32 + cy) & 255) as usize);
        let px = cx as f32 + h as f32 / 255.0;
        let h2 = self.p((h + 1) & 255);
        let py = cy as f32 + h2 as f32 / 255.0;
        (px, py)
    }
}

impl Default for NoiseEngine {
    fn default() -> Self {
        Self::new(12345)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_halves_match_and_cover_all_bytes() {
        let n = NoiseEngine::new(7);
        let mut seen = [false; 256];
        for i in 0..256 {
            assert_eq!(n.perm(i), n.perm(i + 256));
            seen[n.perm(i) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn fade_endpoints() {
        assert_eq!(fade(0.0), 0.0);
        assert_eq!(fade(1.0), 1.0);
        assert!((fade(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn lattice_points_are_midgray() {
        // Gradient noise is zero at integer lattice points, which maps to 0.5.
        let n = NoiseEngine::new(99);
        assert!((n.value_2d(3.0, -4.0) - 0.5).abs() < 1e-6);
        assert!((n.value_3d(1.0, 2.0, -7.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = NoiseEngine::new(1);
        let b = NoiseEngine::new(2);
        let differs = (0..64).any(|i| {
            let x = i as f32 * 0.37 + 0.11;
            a.value_2d(x, x * 0.5) != b.value_2d(x, x * 0.5)
        });
        assert!(differs);
    }
}
