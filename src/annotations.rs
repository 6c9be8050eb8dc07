use std::collections::HashMap;

use image::{GrayImage, RgbaImage};
use imageproc::{distance_transform::Norm, morphology};

use crate::compose::PlacedInstance;

/// One decoded per-instance binary mask, ready to persist.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub class: String,
    /// 0-based index among instances of the same class in this scene.
    pub per_class_index: u32,
    pub mask: GrayImage,
}

impl Annotation {
    pub fn file_name(&self, scene_index: u64) -> String {
        format!(
            "{scene_index}_{}_{}.png",
            self.class.to_lowercase(),
            self.per_class_index
        )
    }
}

/// Decode a colored composite mask back into one binary mask per placed
/// instance, in placement order.
///
/// A pixel is foreground iff its RGB channels equal the instance's exact
/// color, so correctness rests on the per-scene uniqueness of identity values
/// and on later pastes cleanly overwriting earlier ones at overlaps. A 3x3
/// morphological opening removes isolated resampling speckle at mask edges.
pub fn decode(composite: &RgbaImage, instances: &[PlacedInstance]) -> Vec<Annotation> {
    let mut per_class: HashMap<&str, u32> = HashMap::new();
    let mut out = Vec::with_capacity(instances.len());

    for instance in instances {
        let index = per_class.entry(instance.class.as_str()).or_insert(0);
        let color = instance.color.rgba();

        let mut binary = GrayImage::new(composite.width(), composite.height());
        for (x, y, px) in composite.enumerate_pixels() {
            if px.0[0] == color.0[0] && px.0[1] == color.0[1] && px.0[2] == color.0[2] {
                binary.put_pixel(x, y, image::Luma([255]));
            }
        }
        let opened = morphology::open(&binary, Norm::LInf, 1);

        out.push(Annotation {
            class: instance.class.clone(),
            per_class_index: *index,
            mask: opened,
        });
        *index += 1;
    }
    out
}
