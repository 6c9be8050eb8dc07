use std::path::Path;

use anyhow::Context as _;

use crate::error::SceneGenResult;

/// Next sequential index for a new file in `dir`: one more than the number of
/// files already carrying `extension` there.
///
/// Single-writer assumption: two concurrent producers can observe the same
/// count and silently overwrite each other. Nothing here locks or retries.
pub fn next_index(dir: &Path, extension: &str) -> SceneGenResult<u64> {
    if !dir.is_dir() {
        return Ok(1);
    }
    let mut count = 0u64;
    for entry in std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            count += 1;
        }
    }
    Ok(count + 1)
}
