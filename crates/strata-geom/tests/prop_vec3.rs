use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use strata_geom::Vec3;

fn approx_abs_rel(a: f32, b: f32, atol: f32, rtol: f32) -> bool {
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= atol + rtol * scale
}

fn vapprox_abs_rel(a: Vec3, b: Vec3, atol: f32, rtol: f32) -> bool {
    approx_abs_rel(a.x, b.x, atol, rtol)
        && approx_abs_rel(a.y, b.y, atol, rtol)
        && approx_abs_rel(a.z, b.z, atol, rtol)
}

fn coord_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("world-sized", |v| v.is_finite() && v.abs() <= 1e5)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (coord_f32(), coord_f32(), coord_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn unit_t() -> impl Strategy<Value = f32> {
    0.0f32..=1.0
}

proptest! {
    // Lerp hits both endpoints exactly at t = 0 and t = 1
    #[test]
    fn lerp_endpoints(a in arb_vec3(), b in arb_vec3()) {
        prop_assert_eq!(a.lerp(b, 0.0), a);
        prop_assert!(vapprox_abs_rel(a.lerp(b, 1.0), b, 1e-3, 1e-5));
    }

    // Lerp stays inside the box spanned by its endpoints
    #[test]
    fn lerp_stays_between(a in arb_vec3(), b in arb_vec3(), t in unit_t()) {
        let p = a.lerp(b, t);
        let lo = a.min(b);
        let hi = a.max(b);
        let slack = 1e-2;
        prop_assert!(p.x >= lo.x - slack && p.x <= hi.x + slack);
        prop_assert!(p.y >= lo.y - slack && p.y <= hi.y + slack);
        prop_assert!(p.z >= lo.z - slack && p.z <= hi.z + slack);
    }

    // floor never moves a component up and never by a full unit or more
    #[test]
    fn floor_bounds(v in arb_vec3()) {
        let f = v.floor();
        for axis in 0..3 {
            prop_assert!(f.axis(axis) <= v.axis(axis));
            prop_assert!(v.axis(axis) - f.axis(axis) < 1.0 + 1e-3);
        }
    }

    // with_axis only touches the addressed component
    #[test]
    fn with_axis_is_local(v in arb_vec3(), axis in 0usize..3, value in coord_f32()) {
        let w = v.with_axis(axis, value);
        for other in 0..3 {
            if other == axis {
                prop_assert_eq!(w.axis(other), value);
            } else {
                prop_assert_eq!(w.axis(other), v.axis(other));
            }
        }
    }

    // dominant_axis names a component no smaller in magnitude than the others
    #[test]
    fn dominant_axis_is_largest(v in arb_vec3()) {
        let d = v.dominant_axis();
        let m = v.axis(d).abs();
        prop_assert!(m >= v.x.abs() && m >= v.y.abs() && m >= v.z.abs());
    }

    // Negation is an additive inverse
    #[test]
    fn neg_is_additive_inverse(v in arb_vec3()) {
        prop_assert_eq!(v + (-v), Vec3::ZERO);
    }

    // Distance is symmetric and agrees with the difference length
    #[test]
    fn distance_symmetric(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(approx_abs_rel(a.distance(b), b.distance(a), 1e-3, 1e-5));
        prop_assert!(approx_abs_rel(a.distance(b), (a - b).length(), 1e-3, 1e-5));
    }

    // Cross product is orthogonal to its inputs
    #[test]
    fn cross_orthogonal(a in arb_vec3(), b in arb_vec3()) {
        let c = a.cross(b);
        let scale = a.length() * b.length() * a.length().max(b.length()).max(1.0);
        prop_assert!(a.dot(c).abs() <= 1e-3 + 1e-4 * scale);
        prop_assert!(b.dot(c).abs() <= 1e-3 + 1e-4 * scale);
    }
}
