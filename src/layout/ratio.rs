//! Aspect ratio normalization.
//!
//! Raw width/height ratios are mapped into *extension space*
//! (`e = 1 - 1/r` for landscape, `0` for square, approaching `1` as the image
//! gets infinitely wide), soft-clipped there, and mapped back. Portrait ratios
//! go through the reciprocal so both orientations are treated alike.
//!
//! The clip is identity up to the knee `k = 2·limit - 1`, a quadratic that
//! leaves the identity with slope 1 and flattens out exactly at `e = 1`, and
//! constant `limit = 1/(1+√(1-2p))` beyond. With the default `p = 0.444`
//! ratios up to about 2:1 pass unchanged and nothing exceeds about 4:1.

/// Default clip parameter.
pub const DEFAULT_CLIP_PARAM: f64 = 0.444;

/// Saturation value of the clip in extension space.
pub fn clip_limit(param: f64) -> f64 {
    let p = param.clamp(0.0, 0.5);
    1.0 / (1.0 + (1.0 - 2.0 * p).sqrt())
}

/// Odd, saturating soft clip over extension space.
pub fn soft_clip(x: f64, param: f64) -> f64 {
    if !x.is_finite() {
        return if x.is_nan() { 0.0 } else { clip_limit(param) * x.signum() };
    }
    let limit = clip_limit(param);
    let knee = 2.0 * limit - 1.0;
    let magnitude = x.abs();
    let clipped = if magnitude <= knee {
        magnitude
    } else if magnitude >= 1.0 {
        // Saturated; exactly `limit`, so the inverse transform stays finite.
        limit
    } else {
        let over = magnitude - knee;
        magnitude - over * over / (2.0 * (1.0 - knee))
    };
    clipped.copysign(x)
}

/// Landscape ratio to extension space, with portrait ratios negated.
pub fn extension(ratio: f64) -> f64 {
    if ratio >= 1.0 {
        1.0 - 1.0 / ratio
    } else {
        -(1.0 - ratio)
    }
}

/// Inverse of [`extension`].
pub fn from_extension(ext: f64) -> f64 {
    if ext >= 0.0 {
        1.0 / (1.0 - ext)
    } else {
        1.0 + ext
    }
}

/// Normalized ratio expressed in extension space: `0` for a square image.
pub fn normalized_extension(raw_ratio: f64, param: f64) -> f64 {
    soft_clip(extension(sanitize(raw_ratio)), param)
}

/// Bounded ratio used for every layout decision.
pub fn normalize_ratio(raw_ratio: f64, param: f64) -> f64 {
    let ratio = sanitize(raw_ratio);
    if ratio < 1.0 {
        return 1.0 / normalize_ratio(1.0 / ratio, param);
    }
    from_extension(soft_clip(extension(ratio), param))
}

fn sanitize(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: f64 = DEFAULT_CLIP_PARAM;

    #[test]
    fn clip_is_odd() {
        for x in [0.0, 0.1, 0.3, 0.5, 0.62, 0.9, 0.999, 1.0, 3.5] {
            assert_eq!(soft_clip(-x, P), -soft_clip(x, P), "x = {x}");
        }
    }

    #[test]
    fn square_maps_to_zero_extension() {
        assert!(normalized_extension(1.0, P).abs() < 1e-12);
        assert!((normalize_ratio(1.0, P) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn near_square_ratios_pass_unchanged() {
        for r in [1.1, 1.333, 1.5, 1.9] {
            assert!((normalize_ratio(r, P) - r).abs() < 1e-9, "r = {r}");
        }
    }

    #[test]
    fn extreme_ratios_are_bounded() {
        let limit_ratio = from_extension(clip_limit(P));
        let five = normalize_ratio(5.0, P);
        assert!(five < 5.0);
        assert!(five > 2.0);
        assert!(normalize_ratio(1e9, P) <= limit_ratio + 1e-9);
        assert!(normalize_ratio(f64::INFINITY, P).is_finite());
    }

    #[test]
    fn portrait_is_reciprocal_of_landscape() {
        for r in [1.2, 2.5, 5.0, 12.0] {
            let landscape = normalize_ratio(r, P);
            let portrait = normalize_ratio(1.0 / r, P);
            assert!((landscape * portrait - 1.0).abs() < 1e-9, "r = {r}");
        }
    }

    #[test]
    fn curve_is_monotonic_and_continuous_at_the_knee() {
        let mut previous = 0.0;
        let mut x = 0.0;
        while x <= 1.2 {
            let y = soft_clip(x, P);
            assert!(y + 1e-12 >= previous, "not monotonic at {x}");
            assert!(y - previous < 0.011, "jump at {x}");
            previous = y;
            x += 0.01;
        }
    }

    #[test]
    fn saturation_meets_the_quadratic_at_the_boundary() {
        let limit = clip_limit(P);
        assert_eq!(soft_clip(1.0, P), limit);
        assert_eq!(soft_clip(-1.0, P), -limit);
        let inside = soft_clip(1.0 - 1e-7, P);
        assert!(inside <= limit && limit - inside < 1e-6);
        // The curve already passes one half before the boundary.
        assert!(soft_clip(0.9, P) > 0.5);
        assert!(normalize_ratio(f64::MAX, P).is_finite());
    }

    #[test]
    fn degenerate_parameter_saturates_at_one_half() {
        assert_eq!(clip_limit(0.0), 0.5);
        assert_eq!(soft_clip(2.0, 0.0), 0.5);
        assert_eq!(soft_clip(-2.0, 0.0), -0.5);
    }

    #[test]
    fn invalid_ratios_are_treated_as_square() {
        assert_eq!(normalize_ratio(0.0, P), 1.0);
        assert_eq!(normalize_ratio(-3.0, P), 1.0);
        assert_eq!(normalize_ratio(f64::NAN, P), 1.0);
    }
}
