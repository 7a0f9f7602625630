use strata_geom::{Aabb, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn up_is_z() {
    assert_eq!(Vec3::UP, Vec3::new(0.0, 0.0, 1.0));
    assert!(approx_eq(Vec3::UP.cross(Vec3::X).dot(Vec3::Y), 1.0, 1e-6));
}

#[test]
fn normalized_zero_is_noop() {
    let z = Vec3::ZERO.normalized();
    assert_eq!(z, Vec3::ZERO);
    let n = Vec3::new(0.0, 3.0, 4.0).normalized();
    assert!(vec3_approx_eq(n, Vec3::new(0.0, 0.6, 0.8), 1e-6));
}

#[test]
fn floor_handles_negatives() {
    let v = Vec3::new(-0.5, 1.5, -2.0).floor();
    assert_eq!(v, Vec3::new(-1.0, 1.0, -2.0));
}

#[test]
fn dominant_axis_prefers_first_on_ties() {
    assert_eq!(Vec3::new(1.0, 1.0, 1.0).dominant_axis(), 0);
    assert_eq!(Vec3::new(0.0, -2.0, 1.0).dominant_axis(), 1);
    assert_eq!(Vec3::new(0.0, 0.0, -0.1).dominant_axis(), 2);
}

#[test]
fn array_conversions() {
    let v: Vec3 = [1.0, 2.0, 3.0].into();
    let a: [f32; 3] = v.into();
    assert_eq!(a, [1.0, 2.0, 3.0]);
}

#[test]
fn aabb_from_corners_orders_bounds() {
    let b = Aabb::from_corners(Vec3::new(3.0, -1.0, 2.0), Vec3::new(-3.0, 1.0, 0.0));
    assert_eq!(b.min, Vec3::new(-3.0, -1.0, 0.0));
    assert_eq!(b.max, Vec3::new(3.0, 1.0, 2.0));
    assert!(vec3_approx_eq(b.center(), Vec3::new(0.0, 0.0, 1.0), 1e-6));
    assert!(vec3_approx_eq(b.extent(), Vec3::new(6.0, 2.0, 2.0), 1e-6));
}

#[test]
fn aabb_around_contains_center_and_faces() {
    let c = Vec3::new(10.0, -5.0, 2.0);
    let b = Aabb::around(c, 2.5);
    assert!(b.contains(c));
    assert!(b.contains(c + Vec3::new(2.5, 0.0, 0.0)));
    assert!(!b.contains(c + Vec3::new(2.6, 0.0, 0.0)));
}

#[test]
fn aabb_intersection_touching_faces() {
    let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
    let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    let c = Aabb::new(Vec3::new(1.1, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
    assert!(!a.intersects(&c));
    let u = a.union(&c);
    assert_eq!(u.min, Vec3::ZERO);
    assert_eq!(u.max, Vec3::new(2.0, 1.0, 1.0));
}
