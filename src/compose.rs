use anyhow::Context as _;
use image::{GrayImage, RgbImage, Rgba, RgbaImage, imageops};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use crate::{
    annotations,
    asset_store::{AssetStore, Cutout},
    config::ComposerConfig,
    error::{SceneGenError, SceneGenResult},
    layout::{self, ANNOTATIONS_DIR, COLOURED_MASKS_DIR},
    naming, palette, transform,
};

/// Extension of composed scene images; index allocation counts these.
pub const SCENE_EXTENSION: &str = "jpg";

/// Fraction of the canvas the placement range extends past the origin on the
/// negative side, and short of the far edge on the positive side. Objects may
/// end up cropped at scene edges, mimicking partial truncation.
const PLACEMENT_UNDERHANG: f64 = 0.1;
const PLACEMENT_SPAN: f64 = 0.8;

/// What the compositor was asked to place: a class paired with its
/// pre-allocated color, in allocation order.
#[derive(Clone, Debug)]
pub struct InstanceSpec {
    pub class: String,
    pub color: palette::InstanceColor,
}

/// An instance that actually made it into the scene. Specs whose class had no
/// assets are absent; their colors stay unused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedInstance {
    pub class: String,
    pub color: palette::InstanceColor,
}

/// One composed scene: the visible image, the colored composite instance
/// mask, and the placed instances in placement order.
#[derive(Clone, Debug)]
pub struct Scene {
    pub image: RgbImage,
    pub mask: RgbaImage,
    pub instances: Vec<PlacedInstance>,
}

/// Outcome of a batch run. Scene failures are counted, not propagated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub scenes_written: u32,
    pub scenes_failed: u32,
}

/// Drives scene construction end to end: background choice, instance
/// selection, transforms, placement, mask accumulation and persistence.
///
/// Single-threaded, single-writer; all randomness flows through one explicit
/// generator so a fixed seed reproduces the batch byte for byte.
pub struct Compositor {
    config: ComposerConfig,
    store: AssetStore,
}

impl Compositor {
    pub fn new(config: ComposerConfig, store: AssetStore) -> SceneGenResult<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Generate and persist the configured number of scenes. An IO or decode
    /// failure is fatal to its scene only: it is logged and the batch moves
    /// on to the next scene.
    pub fn run(&self) -> SceneGenResult<BatchReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        layout::ensure_tree(&self.config.output_dir, &layout::OUTPUT_FOLDERS)?;

        let mut report = BatchReport::default();
        for _ in 0..self.config.num_scenes {
            match self.generate_one(&mut rng) {
                Ok(index) => {
                    report.scenes_written += 1;
                    info!(scene = index, "scene written");
                }
                Err(err) => {
                    report.scenes_failed += 1;
                    warn!(error = %err, "scene failed, continuing batch");
                }
            }
        }
        Ok(report)
    }

    fn generate_one<R: Rng>(&self, rng: &mut R) -> SceneGenResult<u64> {
        let n = rng.random_range(1..=self.config.max_objects);
        let colors = palette::allocate(n)?;
        let classes = &self.config.classes_to_include;
        let specs: Vec<InstanceSpec> = colors
            .into_iter()
            .map(|color| InstanceSpec {
                class: classes[rng.random_range(0..classes.len())].clone(),
                color,
            })
            .collect();

        let background = self.store.sample_background(rng)?;
        let scene = self.compose_scene(background, &specs, rng)?;

        let index = naming::next_index(&self.config.output_dir, SCENE_EXTENSION)?;
        self.persist_scene(&scene, index)?;
        Ok(index)
    }

    /// Compose one scene from pre-allocated instance specs.
    ///
    /// Instances whose class has no assets are skipped (their color is left
    /// unused). At overlaps a later instance occludes earlier ones in the
    /// composite mask exactly as in the visible image: last instance wins,
    /// there is no blending at color boundaries.
    pub fn compose_scene<R: Rng>(
        &self,
        background: RgbImage,
        specs: &[InstanceSpec],
        rng: &mut R,
    ) -> SceneGenResult<Scene> {
        let (out_w, out_h) = self.config.resolution;
        // Stretch, not crop: aspect ratio is not preserved.
        let mut canvas =
            imageops::resize(&background, out_w, out_h, imageops::FilterType::CatmullRom);
        let mut mask = RgbaImage::from_pixel(out_w, out_h, Rgba([0, 0, 0, 255]));

        let mut instances = Vec::with_capacity(specs.len());
        for spec in specs {
            let cutout = match self.store.sample_cutout(&spec.class, rng) {
                Ok(cutout) => cutout,
                Err(SceneGenError::AssetUnavailable(class)) => {
                    warn!(class = %class, "no assets for class, skipping instance");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let transformed = transform::apply(&cutout, out_w, rng)?;
            let (x, y) = sample_offset(out_w, out_h, rng);

            paste_cutout(&mut canvas, &transformed, x, y);
            paste_color(&mut mask, &transformed.mask, spec.color.rgba(), x, y);

            instances.push(PlacedInstance {
                class: spec.class.clone(),
                color: spec.color,
            });
        }

        Ok(Scene {
            image: canvas,
            mask,
            instances,
        })
    }

    fn persist_scene(&self, scene: &Scene, index: u64) -> SceneGenResult<()> {
        let out = &self.config.output_dir;
        let image_path = out.join(format!("{index}.{SCENE_EXTENSION}"));
        scene
            .image
            .save(&image_path)
            .with_context(|| format!("write scene '{}'", image_path.display()))?;

        // The in-memory mask carries an alpha channel for compositing; the
        // persisted file is flat RGB.
        let mask_path = out.join(COLOURED_MASKS_DIR).join(format!("{index}.png"));
        image::DynamicImage::ImageRgba8(scene.mask.clone())
            .into_rgb8()
            .save(&mask_path)
            .with_context(|| format!("write composite mask '{}'", mask_path.display()))?;

        for annotation in annotations::decode(&scene.mask, &scene.instances) {
            let path = out.join(ANNOTATIONS_DIR).join(annotation.file_name(index));
            annotation
                .mask
                .save(&path)
                .with_context(|| format!("write annotation '{}'", path.display()))?;
        }
        Ok(())
    }
}

fn sample_offset<R: Rng>(w: u32, h: u32, rng: &mut R) -> (i64, i64) {
    let x_lo = -(f64::from(w) * PLACEMENT_UNDERHANG).round() as i64;
    let x_hi = (f64::from(w) * PLACEMENT_SPAN).round() as i64;
    let y_lo = -(f64::from(h) * PLACEMENT_UNDERHANG).round() as i64;
    let y_hi = (f64::from(h) * PLACEMENT_SPAN).round() as i64;
    (
        rng.random_range(x_lo..=x_hi),
        rng.random_range(y_lo..=y_hi),
    )
}

/// Stencil paste: destination takes the source pixel wherever the mask is
/// non-zero, and is untouched elsewhere. Off-canvas parts are clipped.
fn paste_cutout(canvas: &mut RgbImage, cutout: &Cutout, x: i64, y: i64) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    for (px, py, m) in cutout.mask.enumerate_pixels() {
        if m.0[0] == 0 {
            continue;
        }
        let dx = x + i64::from(px);
        let dy = y + i64::from(py);
        if dx < 0 || dy < 0 || dx >= cw || dy >= ch {
            continue;
        }
        let src = cutout.image.get_pixel(px, py);
        canvas.put_pixel(dx as u32, dy as u32, image::Rgb([src[0], src[1], src[2]]));
    }
}

/// Same stencil rule as [`paste_cutout`], but every covered pixel takes the
/// instance color, fully opaque. Later pastes overwrite earlier ones.
fn paste_color(canvas: &mut RgbaImage, stencil: &GrayImage, color: Rgba<u8>, x: i64, y: i64) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    for (px, py, m) in stencil.enumerate_pixels() {
        if m.0[0] == 0 {
            continue;
        }
        let dx = x + i64::from(px);
        let dy = y + i64::from(py);
        if dx < 0 || dy < 0 || dx >= cw || dy >= ch {
            continue;
        }
        canvas.put_pixel(dx as u32, dy as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn solid_cutout(w: u32, h: u32, rgba: [u8; 4]) -> Cutout {
        Cutout {
            image: RgbaImage::from_pixel(w, h, Rgba(rgba)),
            mask: GrayImage::from_pixel(w, h, Luma([255])),
        }
    }

    #[test]
    fn paste_respects_stencil_zeroes() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        let mut cutout = solid_cutout(2, 2, [1, 2, 3, 255]);
        cutout.mask.put_pixel(0, 0, Luma([0]));

        paste_cutout(&mut canvas, &cutout, 1, 1);
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(2, 1), &Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([1, 2, 3]));
    }

    #[test]
    fn paste_clips_partial_off_canvas_placement() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let cutout = solid_cutout(3, 3, [7, 7, 7, 255]);

        paste_cutout(&mut canvas, &cutout, -2, -2);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([7, 7, 7]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn later_color_paste_wins_at_overlap() {
        let mut mask = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let stencil = GrayImage::from_pixel(3, 3, Luma([255]));

        let first = palette::InstanceColor { identity: 1 };
        let second = palette::InstanceColor { identity: 100 };
        paste_color(&mut mask, &stencil, first.rgba(), 0, 0);
        paste_color(&mut mask, &stencil, second.rgba(), 1, 1);

        // Overlap region belongs to the most recent instance only.
        assert_eq!(mask.get_pixel(1, 1), &second.rgba());
        assert_eq!(mask.get_pixel(2, 2), &second.rgba());
        assert_eq!(mask.get_pixel(0, 0), &first.rgba());
    }

    #[test]
    fn offsets_stay_in_extended_placement_range() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..64 {
            let (x, y) = sample_offset(640, 480, &mut rng);
            assert!((-64..=512).contains(&x), "x={x}");
            assert!((-48..=384).contains(&y), "y={y}");
        }
    }
}
