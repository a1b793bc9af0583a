//! RGBE radiance encoding.
//!
//! One shared 8-bit exponent for the three color channels. Decode maps a
//! byte quadruple to linear radiance via `(c + 0.5)/256 * 2^(e-128)`; the
//! all-zero quadruple means exactly zero. Encode extracts the shared exponent
//! from the largest channel with frexp; values too large to represent clamp
//! to solid white, values at or below 1e-32 become transparent black.

use glam::Vec3;

/// Decodes one RGBE quadruple to linear radiance.
#[must_use]
pub fn decode(r: u8, g: u8, b: u8, e: u8) -> Vec3 {
    if r == 0 && g == 0 && b == 0 && e == 0 {
        return Vec3::ZERO;
    }
    let scale = ((i32::from(e) - 128) as f32).exp2() / 256.0;
    Vec3::new(
        (f32::from(r) + 0.5) * scale,
        (f32::from(g) + 0.5) * scale,
        (f32::from(b) + 0.5) * scale,
    )
}

/// Encodes linear radiance as an RGBE quadruple.
#[must_use]
pub fn encode(v: Vec3) -> [u8; 4] {
    let d = v.x.max(v.y).max(v.z);
    if d <= 1e-32 {
        return [0, 0, 0, 0];
    }

    let (mantissa, exponent) = frexp(d);
    if exponent > 127 {
        // Too bright to represent: solid white.
        return [0xff, 0xff, 0xff, 0xff];
    }

    let fac = 255.999 * (mantissa / d);
    let quantize = |c: f32| ((c * fac) as i32).clamp(0, 255) as u8;
    [
        quantize(v.x),
        quantize(v.y),
        quantize(v.z),
        (exponent + 128) as u8,
    ]
}

/// Splits a positive, finite, normal float into mantissa in [0.5, 1) and
/// exponent so that `x = mantissa * 2^exponent`.
fn frexp(x: f32) -> (f32, i32) {
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xff) as i32 - 126;
    let mantissa = f32::from_bits((bits & 0x807f_ffff) | (126 << 23));
    (mantissa, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_round_trips() {
        assert_eq!(encode(Vec3::ZERO), [0, 0, 0, 0]);
        assert_eq!(decode(0, 0, 0, 0), Vec3::ZERO);
    }

    #[test]
    fn frexp_halves() {
        let (m, e) = frexp(1.0);
        assert!((m - 0.5).abs() < 1e-7);
        assert_eq!(e, 1);

        let (m, e) = frexp(0.75);
        assert!((m - 0.75).abs() < 1e-7);
        assert_eq!(e, 0);
    }

    #[test]
    fn unit_white_round_trips() {
        let [r, g, b, e] = encode(Vec3::ONE);
        let back = decode(r, g, b, e);
        assert!((back - Vec3::ONE).abs().max_element() < 1.0 / 256.0);
    }
}
