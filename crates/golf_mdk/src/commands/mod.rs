pub mod build;
pub mod check;
pub mod info;

use golf_lvl::{HeadlessGpu, Level};
use golf_utils::{AnyResult, AnyhowResultExt};
use std::{fs, path::Path};

/// Loads a level file without a real GPU.
fn load_level(path: &Path, gpu: &mut HeadlessGpu) -> AnyResult<Level> {
    let data = fs::read(path).for_path("read", path)?;
    let mut level = Level::new();
    level
        .load(gpu, &path.to_string_lossy(), &data)
        .for_path("load", path)?;
    Ok(level)
}
