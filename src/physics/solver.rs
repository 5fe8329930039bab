//! Contact Resolution
//!
//! Impulse-based velocity response followed by positional depenetration.
//!
//! Restitution is the SUM of both bodies' coefficients, not the average.
//! Tuned content depends on the extra bounce; keep it.

use super::body::Body;
use super::contact::Contact;

/// Resolve one accepted contact between `a` and `b` (in contact order).
///
/// Inactive contacts are ignored.
pub fn resolve(contact: &Contact, a: &mut Body, b: &mut Body) {
    if !contact.active {
        return;
    }
    apply_impulse(contact, a, b);
    correct_position(contact, a, b);
}

/// Velocity change along the contact normal.
///
/// Applied for every active contact, including bodies already moving apart.
fn apply_impulse(contact: &Contact, a: &mut Body, b: &mut Body) {
    let inv_a = a.inv_mass();
    let inv_b = b.inv_mass();
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return;
    }

    let n = contact.normal;
    let v_rel = (b.velocity - a.velocity).dot(n);
    let j = -(1.0 + a.restitution + b.restitution) * v_rel / inv_sum;
    a.velocity -= n * (j * inv_a);
    b.velocity += n * (j * inv_b);
}

/// Push the bodies apart by the penetration vector.
///
/// A static side never moves and the dynamic side takes the full `pierce`.
/// Two dynamic bodies split it by the other body's share of the total
/// mass, so the heavier one moves less.
fn correct_position(contact: &Contact, a: &mut Body, b: &mut Body) {
    let pierce = contact.pierce;
    match (a.is_static, b.is_static) {
        (true, true) => {}
        (true, false) => b.position += pierce,
        (false, true) => a.position -= pierce,
        (false, false) => {
            let total = a.mass + b.mass;
            let (share_a, share_b) = if total > 0.0 {
                (b.mass / total, a.mass / total)
            } else {
                (0.5, 0.5)
            };
            a.position -= pierce * share_a;
            b.position += pierce * share_b;
        }
    }
}
