//! Closed form polynomial solvers used by the torus intersection.

use arrayvec::ArrayVec;
use nalgebra::Complex;

/// Values closer to zero than this are treated as zero when choosing a solution branch.
const ZERO_TOLERANCE: f64 = 1e-14;

/// Real roots of `x^3 + a x^2 + b x + c = 0`.
/// Returns either three roots (possibly repeated) or a single real root.
pub fn solve_cubic(a: f64, b: f64, c: f64) -> ArrayVec<f64, 3> {
    let a2 = a * a;
    let q = (a2 - 3.0 * b) / 9.0;
    let r = (a * (2.0 * a2 - 9.0 * b) + 27.0 * c) / 54.0;
    let r2 = r * r;
    let q3 = q * q * q;
    let shift = a / 3.0;

    let mut roots = ArrayVec::new();
    if r2 < q3 {
        // Three real roots, trigonometric form
        let theta = (r / q3.sqrt()).clamp(-1.0, 1.0).acos();
        let scale = -2.0 * q.sqrt();
        let turn = std::f64::consts::TAU;
        roots.push(scale * (theta / 3.0).cos() - shift);
        roots.push(scale * ((theta + turn) / 3.0).cos() - shift);
        roots.push(scale * ((theta - turn) / 3.0).cos() - shift);
    } else {
        let mut big_a = -(r.abs() + (r2 - q3).sqrt()).cbrt();
        if r < 0.0 {
            big_a = -big_a;
        }
        let big_b = if big_a == 0.0 { 0.0 } else { q / big_a };

        roots.push(big_a + big_b - shift);
        let imaginary = 0.5 * 3f64.sqrt() * (big_a - big_b);
        if imaginary.abs() < ZERO_TOLERANCE {
            // Double root
            roots.push(-0.5 * (big_a + big_b) - shift);
        }
    }
    roots
}

/// Both roots of the monic quadratic `x^2 + p x + q = 0`.
fn solve_monic_quadratic(p: f64, q: f64) -> [Complex<f64>; 2] {
    let discriminant = p * p - 4.0 * q;
    if discriminant < 0.0 {
        let root = Complex::new(-0.5 * p, 0.5 * (-discriminant).sqrt());
        [root, root.conj()]
    } else {
        let sqrt_d = discriminant.sqrt();
        [
            Complex::new(0.5 * (-p + sqrt_d), 0.0),
            Complex::new(0.5 * (-p - sqrt_d), 0.0),
        ]
    }
}

/// All four complex roots of `x^4 + a x^3 + b x^2 + c x + d = 0`.
///
/// Factors the quartic into two real quadratics `(x^2 + p1 x + q1)(x^2 + p2 x + q2)`
/// using a real root `y = q1 + q2` of the resolvent cubic (Ferrari's method).
/// Real roots are returned with an imaginary part of exactly zero.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64) -> [Complex<f64>; 4] {
    let resolvent = solve_cubic(-b, a * c - 4.0 * d, -a * a * d - c * c + 4.0 * b * d);

    // Any root with both discriminants non-negative gives a real factorization,
    // prefer the largest magnitude one for stability.
    let y = resolvent
        .iter()
        .copied()
        .filter(|y| y * y - 4.0 * d >= -ZERO_TOLERANCE && a * a - 4.0 * (b - y) >= -ZERO_TOLERANCE)
        .max_by(|y1, y2| y1.abs().total_cmp(&y2.abs()))
        .or_else(|| resolvent.iter().copied().max_by(|y1, y2| y1.abs().total_cmp(&y2.abs())))
        .unwrap_or(0.0);

    let (p1, p2, q1, q2);
    let discriminant = y * y - 4.0 * d;
    if discriminant.abs() < ZERO_TOLERANCE {
        q1 = 0.5 * y;
        q2 = q1;
        let discriminant = a * a - 4.0 * (b - y);
        if discriminant.abs() < ZERO_TOLERANCE {
            p1 = 0.5 * a;
            p2 = p1;
        } else {
            let sqrt_d = discriminant.max(0.0).sqrt();
            p1 = 0.5 * (a + sqrt_d);
            p2 = 0.5 * (a - sqrt_d);
        }
    } else {
        let sqrt_d = discriminant.max(0.0).sqrt();
        q1 = 0.5 * (y + sqrt_d);
        q2 = 0.5 * (y - sqrt_d);
        p1 = (a * q1 - c) / (q1 - q2);
        p2 = (c - a * q2) / (q1 - q2);
    }

    let [r0, r1] = solve_monic_quadratic(p1, q1);
    let [r2, r3] = solve_monic_quadratic(p2, q2);
    [r0, r1, r2, r3]
}
