use strata_geom::Vec3;
use strata_world::voxel::Voxel;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Where the segment enters the hit cell, in world units.
    pub position: Vec3,
    /// Unit normal of the entered face.
    pub normal: Vec3,
    pub voxel: Voxel,
    /// World voxel coordinate of the hit cell.
    pub cell: [i32; 3],
}

/// Walks the voxel cells crossed by `start..end` (3D DDA over `voxel_size` cells) and returns the first
/// one `probe` reports solid. The walk is capped at `ceil(dist / voxel_size) * 3` steps.
pub fn raycast_cells<F>(start: Vec3, end: Vec3, voxel_size: f32, mut probe: F) -> Option<RayHit>
where
    F: FnMut([i32; 3]) -> Voxel,
{
    if voxel_size <= 0.0 || !start.is_finite() || !end.is_finite() {
        return None;
    }
    let delta = end - start;
    let dist = delta.length();
    let mut cell = [0i32; 3];
    for (a, c) in cell.iter_mut().enumerate() {
        *c = (start.axis(a) / voxel_size).floor() as i32;
    }

    let first = probe(cell);
    if first.is_solid() {
        let normal = if dist > 0.0 {
            let a = delta.dominant_axis();
            Vec3::ZERO.with_axis(a, -delta.axis(a).signum())
        } else {
            Vec3::UP
        };
        return Some(RayHit {
            position: start,
            normal,
            voxel: first,
            cell,
        });
    }
    if dist <= 0.0 {
        return None;
    }

    let dir = delta / dist;
    let mut step = [0i32; 3];
    let mut t_max = [f32::INFINITY; 3];
    let mut t_delta = [f32::INFINITY; 3];
    for a in 0..3 {
        let d = dir.axis(a);
        if d > 0.0 {
            step[a] = 1;
            t_max[a] = ((cell[a] + 1) as f32 * voxel_size - start.axis(a)) / d;
            t_delta[a] = voxel_size / d;
        } else if d < 0.0 {
            step[a] = -1;
            t_max[a] = (cell[a] as f32 * voxel_size - start.axis(a)) / d;
            t_delta[a] = -voxel_size / d;
        }
    }

    let max_steps = (dist / voxel_size).ceil() as usize * 3;
    for _ in 0..max_steps {
        let mut axis = 0;
        for a in 1..3 {
            if t_max[a] < t_max[axis] {
                axis = a;
            }
        }
        let t = t_max[axis];
        if t > dist {
            return None;
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        let v = probe(cell);
        if v.is_solid() {
            return Some(RayHit {
                position: start + dir * t.max(0.0),
                normal: Vec3::ZERO.with_axis(axis, -(step[axis] as f32)),
                voxel: v,
                cell,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::voxel::VoxelKind;

    fn floor_at(top: i32) -> impl FnMut([i32; 3]) -> Voxel {
        move |c: [i32; 3]| {
            if c[2] <= top {
                Voxel::solid(VoxelKind::Stone)
            } else {
                Voxel::AIR
            }
        }
    }

    #[test]
    fn straight_down_hits_top_face() {
        let hit = raycast_cells(Vec3::new(50.0, 50.0, 2000.0), Vec3::new(50.0, 50.0, -2000.0), 100.0, floor_at(5))
            .unwrap();
        assert_eq!(hit.cell, [0, 0, 5]);
        assert_eq!(hit.normal, Vec3::UP);
        assert!((hit.position.z - 600.0).abs() < 1e-3);
    }

    #[test]
    fn misses_when_segment_ends_early() {
        let hit = raycast_cells(Vec3::new(0.0, 0.0, 2000.0), Vec3::new(0.0, 0.0, 700.0), 100.0, floor_at(5));
        assert!(hit.is_none());
    }

    #[test]
    fn sideways_hit_reports_x_face() {
        let wall = |c: [i32; 3]| {
            if c[0] >= 3 {
                Voxel::solid(VoxelKind::Dirt)
            } else {
                Voxel::AIR
            }
        };
        let hit = raycast_cells(Vec3::new(10.0, 5.0, 5.0), Vec3::new(95.0, 7.0, 5.0), 10.0, wall).unwrap();
        assert_eq!(hit.cell[0], 3);
        assert_eq!(hit.normal, Vec3::new(-1.0, 0.0, 0.0));
        assert!((hit.position.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn start_inside_solid_reverses_dominant_axis() {
        let hit = raycast_cells(Vec3::new(5.0, 5.0, 5.0), Vec3::new(5.0, 5.0, 500.0), 10.0, floor_at(3)).unwrap();
        assert_eq!(hit.position, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn water_is_not_a_hit() {
        let pond = |c: [i32; 3]| match c[2] {
            z if z <= 1 => Voxel::solid(VoxelKind::Sand),
            z if z <= 4 => Voxel::solid(VoxelKind::Water),
            _ => Voxel::AIR,
        };
        let hit = raycast_cells(Vec3::new(1.0, 1.0, 95.0), Vec3::new(1.0, 1.0, -5.0), 10.0, pond).unwrap();
        assert_eq!(hit.voxel.kind, VoxelKind::Sand);
        assert_eq!(hit.cell[2], 1);
    }
}
