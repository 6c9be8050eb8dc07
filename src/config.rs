use std::path::PathBuf;

use crate::{
    error::{SceneGenError, SceneGenResult},
    palette,
};

/// Configuration surface consumed by the [`Compositor`](crate::compose::Compositor).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ComposerConfig {
    /// Output resolution as (width, height). Backgrounds are stretched to
    /// this size; aspect ratio is not preserved.
    pub resolution: (u32, u32),
    /// Class names eligible for placement. Must match subfolder names under
    /// the asset directory.
    pub classes_to_include: Vec<String>,
    /// Number of scenes to generate in this batch.
    pub num_scenes: u32,
    /// Upper bound on objects per scene; the actual count is sampled from
    /// [1, max_objects] per scene.
    pub max_objects: u32,
    /// Directory receiving composed scenes, colored masks and annotations.
    pub output_dir: PathBuf,
    /// Root of the extracted-foreground asset tree.
    pub asset_dir: PathBuf,
    /// Seed for the batch RNG. A fixed seed makes every output byte-identical
    /// across runs; absent, the batch seeds from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ComposerConfig {
    pub fn validate(&self) -> SceneGenResult<()> {
        let (w, h) = self.resolution;
        if w == 0 || h == 0 {
            return Err(SceneGenError::configuration(
                "resolution width/height must be > 0",
            ));
        }
        if self.classes_to_include.is_empty() {
            return Err(SceneGenError::configuration(
                "classes_to_include must name at least one class",
            ));
        }
        if self.num_scenes == 0 {
            return Err(SceneGenError::configuration("num_scenes must be >= 1"));
        }
        if self.max_objects == 0 {
            return Err(SceneGenError::configuration("max_objects must be >= 1"));
        }
        if self.max_objects > palette::MAX_INSTANCES {
            return Err(SceneGenError::configuration(format!(
                "max_objects {} exceeds palette capacity of {} instances per scene",
                self.max_objects,
                palette::MAX_INSTANCES
            )));
        }
        Ok(())
    }
}
