//! Perturbation primitives.
//!
//! Each primitive takes a channel-last `(h, w, 3)` image plus its native
//! parameter and returns a **new** channel-first `(3, h, w)` image.  Inputs
//! are never mutated; every primitive works on its own copy.
//!
//! Malformed shapes are rejected with
//! [`PerturbError::InvalidImageShape`].

use ndarray::{Array2, Array3, ArrayView3, Axis};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Normal;
use rand::Rng;
use robustcam_types::{ColorChannel, ColorSpace, Direction, PerturbError};

use crate::color::{hsv_image_to_rgb, rgb_image_to_hsv};
use crate::image::{CHANNELS, check_image, to_channel_first};

/// Focal length of the synthetic pinhole camera used for lens distortion.
pub const FOCAL_LENGTH: f64 = 1000.0;

// ────────────────────────────────────────────────────────────────────────────
// Channel shifts
// ────────────────────────────────────────────────────────────────────────────

/// Resolve [`Direction::Random`] with a fair coin flip: below 0.5 lowers,
/// otherwise raises.  Fixed directions pass through unchanged.
pub fn resolve_direction<R: Rng>(direction: Direction, rng: &mut R) -> Direction {
    match direction {
        Direction::Random => {
            if rng.gen_bool(0.5) {
                Direction::Lower
            } else {
                Direction::Raise
            }
        }
        fixed => fixed,
    }
}

/// Blend one channel toward zero or toward its maximum:
/// `c' = c * (1 - r) + target * r`.
///
/// RGB channels are shifted directly.  H/S/V channels are shifted after an
/// 8-bit RGB → HSV conversion and converted back afterwards.  Shifted values
/// are truncated toward zero when stored back to 8-bit.
pub fn channel_shift<R: Rng>(
    image: ArrayView3<u8>,
    channel: ColorChannel,
    direction: Direction,
    ratio: f64,
    rng: &mut R,
) -> Result<Array3<u8>, PerturbError> {
    check_image(&image)?;
    let target = match resolve_direction(direction, rng) {
        Direction::Lower => 0.0,
        _ => f64::from(channel.max_value()),
    };

    let shifted = match channel.space() {
        ColorSpace::Rgb => {
            let mut copy = image.to_owned();
            blend_channel(&mut copy, channel.index(), target, ratio);
            copy
        }
        ColorSpace::Hsv => {
            let mut hsv = rgb_image_to_hsv(image);
            blend_channel(&mut hsv, channel.index(), target, ratio);
            hsv_image_to_rgb(hsv.view())
        }
    };
    Ok(to_channel_first(shifted.view()))
}

fn blend_channel(image: &mut Array3<u8>, index: usize, target: f64, ratio: f64) {
    image
        .index_axis_mut(Axis(2), index)
        .mapv_inplace(|c| (f64::from(c) * (1.0 - ratio) + target * ratio) as u8);
}

// ────────────────────────────────────────────────────────────────────────────
// Gaussian blur
// ────────────────────────────────────────────────────────────────────────────

/// Fixed binomial-style kernels used for sizes 1, 3, 5 and 7.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Normalised 1-D Gaussian kernel of odd size `ksize`.
///
/// Sizes up to 7 use fixed tables.  Larger sizes derive sigma from the
/// kernel size as `0.3 * ((ksize - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    if ksize % 2 == 1 && ksize <= 7 {
        return SMALL_KERNELS[ksize / 2].to_vec();
    }
    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let scale = -0.5 / (sigma * sigma);
    let centre = (ksize as f64 - 1.0) * 0.5;
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - centre;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Reflect-101 border: `gfedcb|abcdefgh|gfedcba`.  Works for offsets larger
/// than the axis length.
fn reflect_101(p: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let p = p.rem_euclid(period);
    if p >= len as isize {
        (period - p) as usize
    } else {
        p as usize
    }
}

/// Square Gaussian blur with an odd `ksize × ksize` kernel.
pub fn gaussian_blur(image: ArrayView3<u8>, ksize: usize) -> Result<Array3<u8>, PerturbError> {
    check_image(&image)?;
    let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize };
    let kernel = gaussian_kernel(ksize);
    let radius = (ksize / 2) as isize;
    let (h, w, _) = image.dim();

    let mut out = Array3::<u8>::zeros((CHANNELS, h, w));
    let mut horizontal = Array2::<f32>::zeros((h, w));

    for c in 0..CHANNELS {
        let plane = image.index_axis(Axis(2), c);

        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect_101(x as isize + k as isize - radius, w);
                    acc += weight * f32::from(plane[[y, sx]]);
                }
                horizontal[[y, x]] = acc;
            }
        }

        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = reflect_101(y as isize + k as isize - radius, h);
                    acc += weight * horizontal[[sy, x]];
                }
                out[[c, y, x]] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(out)
}

// ────────────────────────────────────────────────────────────────────────────
// Additive Gaussian noise
// ────────────────────────────────────────────────────────────────────────────

/// Add zero-mean Gaussian noise with standard deviation `sigma` to every
/// sample.
///
/// The result is `f32` and is **not** clipped to `[0, 255]`; casting back to
/// 8-bit is left to the caller.  This differs from every other primitive.
pub fn gaussian_noise<R: Rng>(
    image: ArrayView3<u8>,
    sigma: f64,
    rng: &mut R,
) -> Result<Array3<f32>, PerturbError> {
    check_image(&image)?;
    let invalid = || PerturbError::InvalidSeverity {
        value: sigma.to_string(),
        expected: "a finite, non-negative noise sigma".to_string(),
    };
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(invalid());
    }
    let normal = Normal::new(0.0, sigma).map_err(|_| invalid())?;
    let gauss = Array3::<f64>::random_using(image.raw_dim(), normal, rng);
    let noisy = image.mapv(f64::from) + gauss;
    Ok(to_channel_first(noisy.mapv(|v| v as f32).view()))
}

// ────────────────────────────────────────────────────────────────────────────
// Lens distortion
// ────────────────────────────────────────────────────────────────────────────

/// Undistort the image through a synthetic pinhole camera (focal length
/// [`FOCAL_LENGTH`], principal point at the image centre) with distortion
/// coefficients `[k1, k2, p1, p2] = [d, d, 0, 0]`.
///
/// Each output pixel is inverse-mapped through the radial model and sampled
/// bilinearly; samples falling outside the source are black.  The output
/// keeps the input size.
pub fn lens_distort(image: ArrayView3<u8>, coefficient: f64) -> Result<Array3<u8>, PerturbError> {
    check_image(&image)?;
    let (h, w, _) = image.dim();
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let (k1, k2) = (coefficient, coefficient);

    let mut out = Array3::<u8>::zeros((CHANNELS, h, w));
    for v in 0..h {
        for u in 0..w {
            let x = (u as f64 - cx) / FOCAL_LENGTH;
            let y = (v as f64 - cy) / FOCAL_LENGTH;
            let r2 = x * x + y * y;
            let radial = 1.0 + k1 * r2 + k2 * r2 * r2;
            let src_u = FOCAL_LENGTH * x * radial + cx;
            let src_v = FOCAL_LENGTH * y * radial + cy;
            for c in 0..CHANNELS {
                out[[c, v, u]] = sample_bilinear(&image, src_v, src_u, c);
            }
        }
    }
    Ok(out)
}

fn sample_bilinear(image: &ArrayView3<u8>, y: f64, x: f64, c: usize) -> u8 {
    let (h, w, _) = image.dim();
    if !x.is_finite() || !y.is_finite() || x <= -1.0 || y <= -1.0 || x >= w as f64 || y >= h as f64
    {
        return 0;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as isize, y0 as isize);

    let at = |yy: isize, xx: isize| -> f64 {
        if yy < 0 || xx < 0 || yy >= h as isize || xx >= w as isize {
            0.0
        } else {
            f64::from(image[[yy as usize, xx as usize, c]])
        }
    };

    let value = at(y0, x0) * (1.0 - fx) * (1.0 - fy)
        + at(y0, x0 + 1) * fx * (1.0 - fy)
        + at(y0 + 1, x0) * (1.0 - fx) * fy
        + at(y0 + 1, x0 + 1) * fx * fy;
    value.round().clamp(0.0, 255.0) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

/// Zero-perturbation baseline: only the channel-first transposition.
pub fn clean(image: ArrayView3<u8>) -> Result<Array3<u8>, PerturbError> {
    check_image(&image)?;
    Ok(to_channel_first(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn gradient(h: usize, w: usize) -> Array3<u8> {
        Array3::from_shape_fn((h, w, 3), |(y, x, c)| ((y * 7 + x * 13 + c * 50) % 256) as u8)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn primitives_emit_channel_first() {
        let img = gradient(6, 10);
        let mut rng = rng();
        let red = ColorChannel::R;
        assert_eq!(channel_shift(img.view(), red, Direction::Raise, 0.3, &mut rng).unwrap().dim(), (3, 6, 10));
        assert_eq!(gaussian_blur(img.view(), 7).unwrap().dim(), (3, 6, 10));
        assert_eq!(gaussian_noise(img.view(), 20.0, &mut rng).unwrap().dim(), (3, 6, 10));
        assert_eq!(lens_distort(img.view(), 1.0).unwrap().dim(), (3, 6, 10));
        assert_eq!(clean(img.view()).unwrap(), to_channel_first(img.view()));
    }

    #[test]
    fn malformed_shape_is_rejected() {
        let bad = Array3::<u8>::zeros((4, 4, 1));
        let mut rng = rng();
        assert!(matches!(
            gaussian_blur(bad.view(), 7),
            Err(PerturbError::InvalidImageShape { .. })
        ));
        assert!(gaussian_noise(bad.view(), 20.0, &mut rng).is_err());
        assert!(lens_distort(bad.view(), 1.0).is_err());
        assert!(clean(bad.view()).is_err());
        assert!(channel_shift(bad.view(), ColorChannel::H, Direction::Lower, 0.5, &mut rng).is_err());
    }

    #[test]
    fn zero_ratio_shift_is_identity() {
        let img = gradient(5, 9);
        let expected = to_channel_first(img.view());
        let mut rng = rng();
        for channel in [ColorChannel::R, ColorChannel::G, ColorChannel::B] {
            for direction in [Direction::Lower, Direction::Raise] {
                let out = channel_shift(img.view(), channel, direction, 0.0, &mut rng).unwrap();
                assert_eq!(out, expected);
            }
        }
    }

    #[test]
    fn zero_ratio_hsv_shift_is_identity_up_to_rounding() {
        let img = gradient(5, 9);
        let expected = to_channel_first(img.view());
        let mut rng = rng();
        for channel in [ColorChannel::H, ColorChannel::S, ColorChannel::V] {
            let out = channel_shift(img.view(), channel, Direction::Raise, 0.0, &mut rng).unwrap();
            for (a, b) in out.iter().zip(expected.iter()) {
                assert!((i16::from(*a) - i16::from(*b)).abs() <= 4, "{channel:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn full_ratio_rgb_shift_saturates_one_channel() {
        let img = gradient(3, 4);
        let mut rng = rng();
        let up = channel_shift(img.view(), ColorChannel::G, Direction::Raise, 1.0, &mut rng).unwrap();
        assert!(up.index_axis(Axis(0), 1).iter().all(|&v| v == 255));
        assert_eq!(up.index_axis(Axis(0), 0), img.index_axis(Axis(2), 0));

        let down = channel_shift(img.view(), ColorChannel::B, Direction::Lower, 1.0, &mut rng).unwrap();
        assert!(down.index_axis(Axis(0), 2).iter().all(|&v| v == 0));
        assert_eq!(down.index_axis(Axis(0), 1), img.index_axis(Axis(2), 1));
    }

    #[test]
    fn rgb_shift_formula_truncates() {
        let img = Array3::from_elem((1, 1, 3), 100u8);
        let mut rng = rng();
        // 100 * 0.5 + 255 * 0.5 = 177.5 -> 177
        let out = channel_shift(img.view(), ColorChannel::R, Direction::Raise, 0.5, &mut rng).unwrap();
        assert_eq!(out[[0, 0, 0]], 177);
        // 100 * 0.75 = 75
        let out = channel_shift(img.view(), ColorChannel::R, Direction::Lower, 0.25, &mut rng).unwrap();
        assert_eq!(out[[0, 0, 0]], 75);
    }

    #[test]
    fn shift_does_not_mutate_input() {
        let img = gradient(4, 4);
        let before = img.clone();
        let mut rng = rng();
        channel_shift(img.view(), ColorChannel::V, Direction::Lower, 0.9, &mut rng).unwrap();
        channel_shift(img.view(), ColorChannel::R, Direction::Raise, 0.9, &mut rng).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn full_value_lower_blackens_image() {
        let img = gradient(3, 3);
        let mut rng = rng();
        let out = channel_shift(img.view(), ColorChannel::V, Direction::Lower, 1.0, &mut rng).unwrap();
        assert!(out.iter().all(|&v| v == 0));
    }

    #[test]
    fn random_direction_is_fair() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 10_000;
        let lowered = (0..trials)
            .filter(|_| resolve_direction(Direction::Random, &mut rng) == Direction::Lower)
            .count();
        let share = lowered as f64 / trials as f64;
        assert!((0.47..=0.53).contains(&share), "lower share {share}");
    }

    #[test]
    fn fixed_direction_passes_through() {
        let mut rng = rng();
        assert_eq!(resolve_direction(Direction::Raise, &mut rng), Direction::Raise);
        assert_eq!(resolve_direction(Direction::Lower, &mut rng), Direction::Lower);
    }

    #[test]
    fn gaussian_kernel_is_normalised_and_symmetric() {
        for k in [7, 17, 107] {
            let kernel = gaussian_kernel(k);
            assert_eq!(kernel.len(), k);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
            for i in 0..k / 2 {
                assert!((kernel[i] - kernel[k - 1 - i]).abs() < 1e-7);
            }
            assert!(kernel[k / 2] >= kernel[0]);
        }
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        // Kernels wider than the image keep bouncing between the edges.
        assert_eq!(reflect_101(9, 5), 1);
        assert_eq!(reflect_101(-9, 5), 1);
        assert_eq!(reflect_101(17, 1), 0);
    }

    #[test]
    fn seven_tap_kernel_uses_fixed_table() {
        assert_eq!(
            gaussian_kernel(7),
            vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125]
        );
        assert_eq!(gaussian_kernel(3), vec![0.25, 0.5, 0.25]);
        // Larger kernels fall back to the sigma formula.
        let nine = gaussian_kernel(9);
        assert_eq!(nine.len(), 9);
        assert!((nine[4] - 0.2).abs() > 1e-3);
    }

    #[test]
    fn level_one_blur_matches_fixed_table() {
        // Horizontal step edge: every row is 0 left of x = 4 and 255 from x = 4.
        let img = Array3::from_shape_fn((5, 9, 3), |(_, x, _)| if x >= 4 { 255u8 } else { 0 });
        let out = gaussian_blur(img.view(), 7).unwrap();
        // x = 4 sums taps at offsets 0..=3: 255 * (0.28125 + 0.21875 + 0.109375 + 0.03125).
        assert_eq!(out[[0, 2, 4]], 163);
        // x = 3 sums taps at offsets 1..=3: 255 * (0.21875 + 0.109375 + 0.03125).
        assert_eq!(out[[0, 2, 3]], 92);
    }

    #[test]
    fn blur_preserves_flat_images() {
        let img = Array3::from_elem((5, 8, 3), 123u8);
        let out = gaussian_blur(img.view(), 107).unwrap();
        assert!(out.iter().all(|&v| v == 123));
    }

    #[test]
    fn blur_smooths_an_impulse() {
        let mut img = Array3::<u8>::zeros((9, 9, 3));
        img[[4, 4, 0]] = 255;
        let out = gaussian_blur(img.view(), 7).unwrap();
        assert!(out[[0, 4, 4]] < 255);
        assert!(out[[0, 4, 5]] > 0);
        assert!(out.index_axis(Axis(0), 1).iter().all(|&v| v == 0));
    }

    #[test]
    fn noise_is_unclipped_float() {
        let img = Array3::from_elem((16, 16, 3), 250u8);
        let mut rng = rng();
        let out = gaussian_noise(img.view(), 200.0, &mut rng).unwrap();
        assert!(out.iter().any(|&v| v > 255.0));
        assert!(out.iter().any(|&v| v < 0.0));
    }

    #[test]
    fn noise_statistics_follow_sigma() {
        let img = Array3::from_elem((64, 64, 3), 128u8);
        let mut rng = rng();
        let out = gaussian_noise(img.view(), 20.0, &mut rng).unwrap();
        let n = out.len() as f64;
        let mean = out.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let var = out.iter().map(|&v| (f64::from(v) - mean).powi(2)).sum::<f64>() / n;
        assert!((mean - 128.0).abs() < 1.5, "mean {mean}");
        assert!((var.sqrt() - 20.0).abs() < 1.5, "std {}", var.sqrt());
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let img = gradient(8, 8);
        let a = gaussian_noise(img.view(), 50.0, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = gaussian_noise(img.view(), 50.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_sigma_is_invalid_severity() {
        let img = gradient(2, 2);
        for sigma in [-1.0, -50.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    gaussian_noise(img.view(), sigma, &mut rng()),
                    Err(PerturbError::InvalidSeverity { .. })
                ),
                "sigma {sigma} must be rejected"
            );
        }
        assert!(gaussian_noise(img.view(), 0.0, &mut rng()).is_ok());
    }

    #[test]
    fn distortion_keeps_centre_and_blackens_corners() {
        let img = Array3::from_elem((66, 200, 3), 200u8);
        let out = lens_distort(img.view(), 500.0).unwrap();
        // Principal point maps onto itself.
        assert_eq!(out[[0, 33, 100]], 200);
        // Corners sample far outside the source.
        assert_eq!(out[[0, 0, 0]], 0);
        assert_eq!(out[[2, 65, 199]], 0);
    }

    #[test]
    fn weak_distortion_is_nearly_identity() {
        let img = gradient(20, 30);
        let out = lens_distort(img.view(), 1.0).unwrap();
        let expected = to_channel_first(img.view());
        let max_delta = out
            .iter()
            .zip(expected.iter())
            .map(|(a, b)| (i16::from(*a) - i16::from(*b)).abs())
            .max()
            .unwrap();
        assert!(max_delta <= 2, "max delta {max_delta}");
    }
}
