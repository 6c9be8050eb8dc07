use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::{GrayImage, RgbImage, RgbaImage};
use rand::Rng;

use crate::error::{SceneGenError, SceneGenResult};

/// Subfolder holding background photos.
pub const BACKGROUNDS_DIR: &str = "Backgrounds";
/// Subfolder holding extracted foreground objects, one subfolder per class.
pub const CUTOUTS_DIR: &str = "EFObjects";
/// Subfolder holding binary silhouette masks, mirroring the cut-out tree.
pub const MASKS_DIR: &str = "Mask";

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// An extracted foreground object: RGBA image plus its silhouette mask.
/// The two layers always have identical dimensions.
#[derive(Clone, Debug)]
pub struct Cutout {
    pub image: RgbaImage,
    pub mask: GrayImage,
}

#[derive(Clone, Debug)]
struct CutoutEntry {
    image_path: PathBuf,
    mask_path: PathBuf,
}

/// Read-only view over the extracted-foreground asset tree.
///
/// Layout contract (written by the segmenter, see [`crate::chroma`]):
/// `<root>/EFObjects/<Class>/<id>.png` paired 1:1 by file stem with
/// `<root>/Mask/<Class>/<id>.png`, plus `<root>/Backgrounds/` with photos.
#[derive(Clone, Debug)]
pub struct AssetStore {
    backgrounds: Vec<PathBuf>,
    cutouts: BTreeMap<String, Vec<CutoutEntry>>,
}

impl AssetStore {
    /// Scan the asset tree rooted at `root`. Listings are sorted by file name
    /// so that sampling is reproducible for a fixed seed.
    pub fn open(root: &Path) -> SceneGenResult<Self> {
        let backgrounds = list_images(&root.join(BACKGROUNDS_DIR))?;

        let mut cutouts = BTreeMap::new();
        let cutout_root = root.join(CUTOUTS_DIR);
        let mask_root = root.join(MASKS_DIR);
        for class_dir in list_dirs(&cutout_root)? {
            let class = class_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    SceneGenError::compose(format!(
                        "class folder '{}' has a non-UTF-8 name",
                        class_dir.display()
                    ))
                })?;

            let mut entries = Vec::new();
            for image_path in list_images(&class_dir)? {
                let Some(stem) = image_path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let mask_path = mask_root.join(&class).join(format!("{stem}.png"));
                if mask_path.is_file() {
                    entries.push(CutoutEntry {
                        image_path,
                        mask_path,
                    });
                }
            }
            cutouts.insert(class, entries);
        }

        Ok(Self {
            backgrounds,
            cutouts,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.cutouts.keys().map(String::as_str)
    }

    pub fn background_count(&self) -> usize {
        self.backgrounds.len()
    }

    pub fn cutout_count(&self, class: &str) -> usize {
        self.cutouts.get(class).map_or(0, Vec::len)
    }

    /// Pick a background uniformly at random and load it as RGB.
    pub fn sample_background<R: Rng>(&self, rng: &mut R) -> SceneGenResult<RgbImage> {
        if self.backgrounds.is_empty() {
            return Err(SceneGenError::compose("no background images available"));
        }
        let path = &self.backgrounds[rng.random_range(0..self.backgrounds.len())];
        let img = image::open(path)
            .with_context(|| format!("decode background '{}'", path.display()))?;
        Ok(img.to_rgb8())
    }

    /// Pick a cut-out uniformly at random from `class` and load both layers.
    /// Returns [`SceneGenError::AssetUnavailable`] when the class has no
    /// assets; callers treat this as skip-and-continue, not failure.
    pub fn sample_cutout<R: Rng>(&self, class: &str, rng: &mut R) -> SceneGenResult<Cutout> {
        let entries = self
            .cutouts
            .get(class)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SceneGenError::asset_unavailable(class))?;
        let entry = &entries[rng.random_range(0..entries.len())];

        let image = image::open(&entry.image_path)
            .with_context(|| format!("decode cut-out '{}'", entry.image_path.display()))?
            .to_rgba8();
        let mask = image::open(&entry.mask_path)
            .with_context(|| format!("decode mask '{}'", entry.mask_path.display()))?
            .to_luma8();

        if image.dimensions() != mask.dimensions() {
            return Err(SceneGenError::compose(format!(
                "cut-out '{}' is {}x{} but its mask is {}x{}",
                entry.image_path.display(),
                image.width(),
                image.height(),
                mask.width(),
                mask.height()
            )));
        }
        Ok(Cutout { image, mask })
    }
}

fn list_dirs(dir: &Path) -> SceneGenResult<Vec<PathBuf>> {
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

fn list_images(dir: &Path) -> SceneGenResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
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
