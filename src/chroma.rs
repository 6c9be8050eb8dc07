use std::path::Path;

use anyhow::Context as _;
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::info;

use crate::{
    asset_store::{CUTOUTS_DIR, IMAGE_EXTENSIONS, MASKS_DIR, Cutout},
    error::{SceneGenError, SceneGenResult},
    layout::{self, CLASSES_DIR},
    naming,
};

/// Width of each backdrop sampling strip, as a fraction of the image width.
const STRIP_FRACTION: f64 = 0.05;
/// Half-width of the accepted hue band around the backdrop's median hue.
const HUE_TOLERANCE: f64 = 15.0;
const MIN_SATURATION: f64 = 80.0;
const MIN_VALUE: f64 = 80.0;

/// HSV thresholding range for the backdrop color. Hue uses the 0..180 scale,
/// saturation and value 0..256.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HsvRange {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
}

impl HsvRange {
    fn contains(&self, hsv: [f64; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Estimate the backdrop's HSV range from two narrow strips at the left and
/// right edges of the photo, which are assumed to show only backdrop. The
/// band is the median strip hue plus/minus a fixed tolerance, floored at a
/// minimum saturation and value so washed-out pixels never match.
pub fn estimate_backdrop_range(image: &RgbImage) -> SceneGenResult<HsvRange> {
    let (w, h) = image.dimensions();
    let strip = ((f64::from(w) * STRIP_FRACTION) as u32).max(1);
    if w < 2 * strip || h == 0 {
        return Err(SceneGenError::compose(
            "image too narrow for backdrop hue estimation",
        ));
    }

    let mut hues = Vec::with_capacity((2 * strip * h) as usize);
    for y in 0..h {
        for x in (0..strip).chain(w - strip..w) {
            let [hue, _, _] = rgb_to_hsv(*image.get_pixel(x, y));
            hues.push(hue);
        }
    }
    hues.sort_by(|a, b| a.total_cmp(b));
    let mid = hues.len() / 2;
    let median = if hues.len() % 2 == 0 {
        (hues[mid - 1] + hues[mid]) / 2.0
    } else {
        hues[mid]
    };

    Ok(HsvRange {
        lower: [(median - HUE_TOLERANCE).max(0.0), MIN_SATURATION, MIN_VALUE],
        upper: [(median + HUE_TOLERANCE).min(180.0), 255.0, 255.0],
    })
}

/// Cut the foreground out of a single-colored-backdrop photo: pixels inside
/// the backdrop range become transparent, everything else is kept opaque.
/// Returns the RGBA cut-out paired with its binary silhouette mask.
pub fn extract(image: &RgbImage, range: &HsvRange) -> Cutout {
    let (w, h) = image.dimensions();
    let mut cutout = RgbaImage::new(w, h);
    let mut mask = GrayImage::new(w, h);

    for (x, y, px) in image.enumerate_pixels() {
        let is_backdrop = range.contains(rgb_to_hsv(*px));
        let alpha = if is_backdrop { 0 } else { 255 };
        cutout.put_pixel(x, y, Rgba([px[0], px[1], px[2], alpha]));
        mask.put_pixel(x, y, Luma([alpha]));
    }
    Cutout {
        image: cutout,
        mask,
    }
}

/// Walk `<root>/Classes/<Class>/` and write one cut-out plus one mask per
/// source photo into `<root>/EFObjects/<Class>/` and `<root>/Mask/<Class>/`,
/// paired by a sequential numeric id. This is the chroma-key strategy of the
/// segmenter contract consumed by [`crate::asset_store::AssetStore`].
pub fn extract_class_tree(root: &Path) -> SceneGenResult<u32> {
    let classes_root = root.join(CLASSES_DIR);
    layout::replicate_class_tree(&classes_root, &root.join(CUTOUTS_DIR))?;
    layout::replicate_class_tree(&classes_root, &root.join(MASKS_DIR))?;

    let mut written = 0u32;
    for class_dir in list_dirs(&classes_root)? {
        let Some(class) = class_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let cutout_dir = root.join(CUTOUTS_DIR).join(class);
        let mask_dir = root.join(MASKS_DIR).join(class);

        for photo in list_images(&class_dir)? {
            let image = image::open(&photo)
                .with_context(|| format!("decode source photo '{}'", photo.display()))?
                .to_rgb8();
            let range = estimate_backdrop_range(&image)?;
            let cutout = extract(&image, &range);

            let id = naming::next_index(&cutout_dir, "png")?;
            let cutout_path = cutout_dir.join(format!("{id}.png"));
            cutout
                .image
                .save(&cutout_path)
                .with_context(|| format!("write cut-out '{}'", cutout_path.display()))?;
            let mask_path = mask_dir.join(format!("{id}.png"));
            cutout
                .mask
                .save(&mask_path)
                .with_context(|| format!("write mask '{}'", mask_path.display()))?;
            written += 1;
        }
        info!(class, "extracted foregrounds");
    }
    Ok(written)
}

/// RGB to HSV with hue on the 0..180 scale and saturation/value on 0..255.
fn rgb_to_hsv(px: Rgb<u8>) -> [f64; 3] {
    let r = f64::from(px[0]) / 255.0;
    let g = f64::from(px[1]) / 255.0;
    let b = f64::from(px[2]) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    [hue_deg / 2.0, saturation * 255.0, max * 255.0]
}

fn list_dirs(dir: &Path) -> SceneGenResult<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        if entry.path().is_dir() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn list_images(dir: &Path) -> SceneGenResult<Vec<std::path::PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if path.is_file() && is_image {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_conversion_matches_known_colors() {
        // Pure green: hue 120 deg -> 60 on the half scale.
        let [h, s, v] = rgb_to_hsv(Rgb([0, 255, 0]));
        assert!((h - 60.0).abs() < 1e-9);
        assert!((s - 255.0).abs() < 1e-9);
        assert!((v - 255.0).abs() < 1e-9);

        // Grey has no saturation.
        let [_, s, v] = rgb_to_hsv(Rgb([100, 100, 100]));
        assert_eq!(s, 0.0);
        assert!((v - 100.0).abs() < 1.0);
    }

    fn green_backdrop_photo(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, Rgb([0, 220, 30]));
        // Red square in the middle as the "object".
        for y in h / 4..3 * h / 4 {
            for x in w / 4..3 * w / 4 {
                img.put_pixel(x, y, Rgb([200, 20, 20]));
            }
        }
        img
    }

    #[test]
    fn estimate_brackets_the_backdrop_hue() {
        let img = green_backdrop_photo(40, 30);
        let range = estimate_backdrop_range(&img).unwrap();
        let [h, _, _] = rgb_to_hsv(Rgb([0, 220, 30]));
        assert!(range.lower[0] <= h && h <= range.upper[0]);
    }

    #[test]
    fn even_sample_median_averages_the_two_central_hues() {
        // Left strip pure red (hue 0), right strip pure blue (hue 120 on the
        // half scale); equal counts make the sample even, so the median is
        // the mean of the two central values: 60.
        let mut img = RgbImage::from_pixel(40, 10, Rgb([255, 255, 255]));
        for y in 0..10 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgb([255, 0, 0]));
                img.put_pixel(38 + x, y, Rgb([0, 0, 255]));
            }
        }

        let range = estimate_backdrop_range(&img).unwrap();
        assert!((range.lower[0] - 45.0).abs() < 1e-9);
        assert!((range.upper[0] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn extract_keeps_object_and_drops_backdrop() {
        let img = green_backdrop_photo(40, 30);
        let range = estimate_backdrop_range(&img).unwrap();
        let cutout = extract(&img, &range);

        assert_eq!(cutout.image.dimensions(), cutout.mask.dimensions());
        // Object center is opaque, backdrop corner transparent.
        assert_eq!(cutout.mask.get_pixel(20, 15).0[0], 255);
        assert_eq!(cutout.mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(cutout.image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn estimate_rejects_too_narrow_images() {
        let img = RgbImage::from_pixel(1, 4, Rgb([0, 255, 0]));
        assert!(estimate_backdrop_range(&img).is_err());
    }
}
