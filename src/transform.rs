use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;

use crate::{
    asset_store::Cutout,
    error::{SceneGenError, SceneGenResult},
};

/// Smallest sampled cut-out width, as a fraction of the background width.
pub const MIN_WIDTH_FRACTION: f64 = 0.005;
/// Largest sampled cut-out width, as a fraction of the background width.
pub const MAX_WIDTH_FRACTION: f64 = 0.6;

/// Resize a cut-out to a new width, preserving aspect ratio. When no
/// `target_width` is given, one is sampled uniformly from
/// [0.005 * bg_width, 0.6 * bg_width] (lower bound at least 1 pixel).
///
/// Both layers are resampled with the same smooth filter and always end with
/// identical dimensions.
pub fn scale<R: Rng>(
    cutout: &Cutout,
    bg_width: u32,
    target_width: Option<u32>,
    rng: &mut R,
) -> SceneGenResult<Cutout> {
    let (w, h) = cutout.image.dimensions();
    if w == 0 || h == 0 {
        return Err(SceneGenError::compose("cannot scale an empty cut-out"));
    }
    if bg_width == 0 {
        return Err(SceneGenError::compose(
            "background width must be > 0 for scaling",
        ));
    }

    let new_w = match target_width {
        Some(w) => w.max(1),
        None => {
            let lo = ((f64::from(bg_width) * MIN_WIDTH_FRACTION) as u32).max(1);
            let hi = ((f64::from(bg_width) * MAX_WIDTH_FRACTION) as u32).max(lo);
            rng.random_range(lo..=hi)
        }
    };
    let new_h = ((f64::from(new_w) * f64::from(h) / f64::from(w)).round() as u32).max(1);

    Ok(Cutout {
        image: imageops::resize(&cutout.image, new_w, new_h, imageops::FilterType::CatmullRom),
        mask: imageops::resize(&cutout.mask, new_w, new_h, imageops::FilterType::CatmullRom),
    })
}

/// Rotate both layers by the same angle (sampled uniformly from [0, 359]
/// degrees when absent) into a canvas grown to the full rotated extent, with
/// transparent fill outside the original content.
pub fn rotate<R: Rng>(cutout: &Cutout, angle_degrees: Option<u32>, rng: &mut R) -> Cutout {
    let angle = match angle_degrees {
        Some(a) => a % 360,
        None => rng.random_range(0..=359),
    };
    let theta = (f64::from(angle)).to_radians();
    let (sin, cos) = theta.sin_cos();

    let (w, h) = cutout.image.dimensions();
    let rot_w = ((f64::from(w) * cos.abs() + f64::from(h) * sin.abs()).round() as u32).max(1);
    let rot_h = ((f64::from(w) * sin.abs() + f64::from(h) * cos.abs()).round() as u32).max(1);

    // Pad to the union of the original and rotated extents, rotate about the
    // padded center, then crop back to the rotated extent. Centering keeps
    // both steps lossless.
    let pad_w = w.max(rot_w);
    let pad_h = h.max(rot_h);
    let dx = i64::from((pad_w - w) / 2);
    let dy = i64::from((pad_h - h) / 2);

    let mut padded_image = RgbaImage::from_pixel(pad_w, pad_h, Rgba([0, 0, 0, 0]));
    imageops::replace(&mut padded_image, &cutout.image, dx, dy);
    let mut padded_mask = GrayImage::from_pixel(pad_w, pad_h, Luma([0]));
    imageops::replace(&mut padded_mask, &cutout.mask, dx, dy);

    let rotated_image = rotate_about_center(
        &padded_image,
        theta as f32,
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
    );
    let rotated_mask =
        rotate_about_center(&padded_mask, theta as f32, Interpolation::Bicubic, Luma([0]));

    let crop_x = (pad_w - rot_w) / 2;
    let crop_y = (pad_h - rot_h) / 2;
    Cutout {
        image: imageops::crop_imm(&rotated_image, crop_x, crop_y, rot_w, rot_h).to_image(),
        mask: imageops::crop_imm(&rotated_mask, crop_x, crop_y, rot_w, rot_h).to_image(),
    }
}

/// Horizontally flip both layers together on a fair coin (or the explicit
/// `flip` flag). The layers are never flipped independently.
pub fn mirror<R: Rng>(cutout: &Cutout, flip: Option<bool>, rng: &mut R) -> Cutout {
    let flip = flip.unwrap_or_else(|| rng.random_bool(0.5));
    if !flip {
        return cutout.clone();
    }
    Cutout {
        image: imageops::flip_horizontal(&cutout.image),
        mask: imageops::flip_horizontal(&cutout.mask),
    }
}

/// Full per-instance pipeline: scale, then rotate, then mirror. Rotation runs
/// on the already-reduced size; mirroring commutes with both and runs last.
pub fn apply<R: Rng>(cutout: &Cutout, bg_width: u32, rng: &mut R) -> SceneGenResult<Cutout> {
    let scaled = scale(cutout, bg_width, None, rng)?;
    let rotated = rotate(&scaled, None, rng);
    Ok(mirror(&rotated, None, rng))
}
