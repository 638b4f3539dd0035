/// Cubic s-curve easing on [0, 1].
pub fn scurve3(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Pick `inside` where `control` lies within `[lower, upper]` and `outside`
/// elsewhere, easing between them over `falloff` on either side of each bound.
///
/// With a zero falloff the edges are hard. The falloff is clamped to half the
/// band width so the two transition zones never overlap.
pub fn threshold_select(
    control: f64,
    lower: f64,
    upper: f64,
    falloff: f64,
    outside: f64,
    inside: f64,
) -> f64 {
    let half_band = (upper - lower) * 0.5;
    let falloff = falloff.clamp(0.0, half_band.max(0.0));

    if falloff <= 0.0 {
        return if control < lower || control > upper {
            outside
        } else {
            inside
        };
    }

    if control < lower - falloff {
        outside
    } else if control < lower + falloff {
        let t = (control - (lower - falloff)) / (2.0 * falloff);
        lerp(outside, inside, scurve3(t))
    } else if control < upper - falloff {
        inside
    } else if control < upper + falloff {
        let t = (control - (upper - falloff)) / (2.0 * falloff);
        lerp(inside, outside, scurve3(t))
    } else {
        outside
    }
}
