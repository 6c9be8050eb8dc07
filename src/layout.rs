use std::path::Path;

use anyhow::Context as _;

use crate::{
    asset_store::{BACKGROUNDS_DIR, CUTOUTS_DIR, MASKS_DIR},
    error::SceneGenResult,
};

/// Subfolder of the asset tree holding raw per-class source photos.
pub const CLASSES_DIR: &str = "Classes";
/// Output subfolder for per-instance binary annotation masks.
pub const ANNOTATIONS_DIR: &str = "Annotations";
/// Output subfolder for colored composite instance masks.
pub const COLOURED_MASKS_DIR: &str = "ColouredMasks";

pub const INPUT_FOLDERS: [&str; 4] = [BACKGROUNDS_DIR, CLASSES_DIR, CUTOUTS_DIR, MASKS_DIR];
pub const OUTPUT_FOLDERS: [&str; 2] = [ANNOTATIONS_DIR, COLOURED_MASKS_DIR];

/// Create any of the named subfolders of `root` that do not exist yet.
pub fn ensure_tree(root: &Path, folders: &[&str]) -> SceneGenResult<()> {
    for folder in folders {
        let path = root.join(folder);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("create folder '{}'", path.display()))?;
    }
    Ok(())
}

/// Mirror the per-class subfolder tree of `src` into `dst`, creating missing
/// class folders. Files are never copied, only directories.
pub fn replicate_class_tree(src: &Path, dst: &Path) -> SceneGenResult<()> {
    std::fs::create_dir_all(dst).with_context(|| format!("create folder '{}'", dst.display()))?;
    if !src.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(src).with_context(|| format!("list '{}'", src.display()))? {
        let entry = entry.with_context(|| format!("list '{}'", src.display()))?;
        if entry.path().is_dir() {
            let target = dst.join(entry.file_name());
            std::fs::create_dir_all(&target)
                .with_context(|| format!("create folder '{}'", target.display()))?;
        }
    }
    Ok(())
}
