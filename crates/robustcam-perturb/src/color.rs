//! 8-bit RGB ↔ HSV conversion.
//!
//! Hue is stored in half-degrees (`0..180`), saturation and value in
//! `0..=255`, the same convention camera pipelines use for 8-bit HSV.

use ndarray::{Array3, ArrayView3, Zip};

/// Convert a single RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (ri, gi, bi) = (i32::from(r), i32::from(g), i32::from(b));
    let v = ri.max(gi).max(bi);
    let diff = v - ri.min(gi).min(bi);

    let s = if v == 0 {
        0
    } else {
        round_half_up(255.0 * diff as f32 / v as f32)
    };

    let h = if diff == 0 {
        0
    } else {
        // Sector offsets in units of the hue range / 6.
        let numerator = if v == ri {
            gi - bi
        } else if v == gi {
            bi - ri + 2 * diff
        } else {
            ri - gi + 4 * diff
        };
        let h = round_half_up(numerator as f32 * 30.0 / diff as f32);
        if h < 0 { h + 180 } else { h }
    };

    [h.clamp(0, 179) as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Convert a single 8-bit HSV pixel back to RGB.
pub fn hsv_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    let s = f32::from(s) / 255.0;
    let v = f32::from(v) / 255.0;

    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let mut h = f32::from(h) * (6.0 / 180.0);
        while h >= 6.0 {
            h -= 6.0;
        }
        let sector = h.floor();
        let frac = h - sector;

        let p = v * (1.0 - s);
        let q = v * (1.0 - s * frac);
        let t = v * (1.0 - s * (1.0 - frac));

        match sector as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };

    [to_byte(r), to_byte(g), to_byte(b)]
}

/// Convert a channel-last RGB image to channel-last HSV.
pub fn rgb_image_to_hsv(image: ArrayView3<u8>) -> Array3<u8> {
    map_pixels(image, rgb_to_hsv)
}

/// Convert a channel-last HSV image to channel-last RGB.
pub fn hsv_image_to_rgb(image: ArrayView3<u8>) -> Array3<u8> {
    map_pixels(image, hsv_to_rgb)
}

fn map_pixels(image: ArrayView3<u8>, f: fn([u8; 3]) -> [u8; 3]) -> Array3<u8> {
    let mut out = Array3::<u8>::zeros(image.raw_dim());
    Zip::from(out.rows_mut())
        .and(image.rows())
        .for_each(|mut dst, src| {
            let converted = f([src[0], src[1], src[2]]);
            dst[0] = converted[0];
            dst[1] = converted[1];
            dst[2] = converted[2];
        });
    out
}

fn round_half_up(x: f32) -> i32 {
    (x + 0.5).floor() as i32
}

fn to_byte(unit: f32) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn primary_colours_to_hsv() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(hsv_to_rgb([90, 0, 200]), [200, 200, 200]);
    }

    #[test]
    fn magenta_wraps_hue() {
        // R max with B > G gives a negative offset that wraps into 150..180.
        assert_eq!(rgb_to_hsv([255, 0, 255]), [150, 255, 255]);
    }

    #[test]
    fn pure_red_round_trips() {
        assert_eq!(hsv_to_rgb(rgb_to_hsv([255, 0, 0])), [255, 0, 0]);
    }

    #[test]
    fn hue_of_180_wraps_to_red() {
        assert_eq!(hsv_to_rgb([180, 255, 255]), [255, 0, 0]);
    }

    #[test]
    fn round_trip_is_close_for_saturated_colours() {
        for pixel in [[200, 30, 60], [10, 180, 90], [40, 70, 220], [255, 255, 0], [90, 60, 30]] {
            let back = hsv_to_rgb(rgb_to_hsv(pixel));
            for c in 0..3 {
                let delta = (i32::from(back[c]) - i32::from(pixel[c])).abs();
                assert!(delta <= 4, "{pixel:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn image_conversion_is_per_pixel() {
        let mut img = Array3::<u8>::zeros((1, 2, 3));
        img[[0, 0, 0]] = 255;
        img[[0, 1, 2]] = 255;
        let hsv = rgb_image_to_hsv(img.view());
        assert_eq!(hsv.as_slice().unwrap(), &[0, 255, 255, 120, 255, 255]);
        assert_eq!(hsv_image_to_rgb(hsv.view()), img);
    }
}
