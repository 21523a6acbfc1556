//! sRGB ↔ CIELAB (D65) conversion for perceptually even interpolation.

use super::Rgb;

const XN: f64 = 0.950_47;
const YN: f64 = 1.0;
const ZN: f64 = 1.088_83;
const EPSILON: f64 = 216.0 / 24389.0;
const KAPPA: f64 = 24389.0 / 27.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

fn f_inv(t: f64) -> f64 {
    let t3 = t * t * t;
    if t3 > EPSILON {
        t3
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

impl From<Rgb> for Lab {
    fn from(color: Rgb) -> Self {
        let r = srgb_to_linear(color.r as f64 / 255.0);
        let g = srgb_to_linear(color.g as f64 / 255.0);
        let b = srgb_to_linear(color.b as f64 / 255.0);

        let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
        let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

        let (fx, fy, fz) = (f(x / XN), f(y / YN), f(z / ZN));
        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

impl From<Lab> for Rgb {
    fn from(lab: Lab) -> Self {
        let fy = (lab.l + 16.0) / 116.0;
        let fx = fy + lab.a / 500.0;
        let fz = fy - lab.b / 200.0;
        let (x, y, z) = (f_inv(fx) * XN, f_inv(fy) * YN, f_inv(fz) * ZN);

        let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
        let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
        let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

        let channel = |c: f64| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb::new(channel(r), channel(g), channel(b))
    }
}

/// Interpolate two colors through CIELAB. Endpoints are returned exactly.
pub fn interpolate(from: Rgb, to: Rgb, t: f64) -> Rgb {
    if t <= 0.0 || !t.is_finite() {
        return from;
    }
    if t >= 1.0 {
        return to;
    }
    let (a, b) = (Lab::from(from), Lab::from(to));
    Rgb::from(Lab {
        l: a.l + (b.l - a.l) * t,
        a: a.a + (b.a - a.a) * t,
        b: a.b + (b.b - a.b) * t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{GREEN, RED, YELLOW};

    #[test]
    fn test_round_trip_is_close() {
        for color in [GREEN, RED, YELLOW, Rgb::new(12, 200, 99), Rgb::new(255, 255, 255)] {
            let back = Rgb::from(Lab::from(color));
            assert!((back.r as i16 - color.r as i16).abs() <= 1);
            assert!((back.g as i16 - color.g as i16).abs() <= 1);
            assert!((back.b as i16 - color.b as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_white_is_l100() {
        let lab = Lab::from(Rgb::new(255, 255, 255));
        assert!((lab.l - 100.0).abs() < 0.01);
        assert!(lab.a.abs() < 0.01);
        assert!(lab.b.abs() < 0.01);
    }

    #[test]
    fn test_interpolate_endpoints_exact() {
        assert_eq!(interpolate(RED, GREEN, 0.0), RED);
        assert_eq!(interpolate(RED, GREEN, 1.0), GREEN);
        let mid = interpolate(RED, GREEN, 0.5);
        assert_ne!(mid, RED);
        assert_ne!(mid, GREEN);
    }
}
