use super::load_level;
use clap::Args;
use golf_lvl::HeadlessGpu;
use golf_utils::{ok, AnyResult};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Args)]
pub struct CheckCommand {
    /// Level files to check
    #[clap(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
#[error("{failed} of {total} levels aren't playable")]
pub struct CheckFailed {
    pub failed: usize,
    pub total: usize,
}

impl crate::Command for CheckCommand {
    fn run(self) -> AnyResult {
        let mut failed = 0;

        for path in &self.files {
            let mut gpu = HeadlessGpu::new();
            let mut level = match load_level(path, &mut gpu) {
                Ok(level) => level,
                Err(error) => {
                    println!("{}: {error:#}", path.display());
                    failed += 1;
                    continue;
                }
            };

            let issues = level.check_playable();
            if issues.is_empty() {
                println!("{}: ok", path.display());
            } else {
                failed += 1;
                for issue in issues {
                    println!("{}: {issue}", path.display());
                }
            }

            level.unload(&mut gpu);
        }

        if failed > 0 {
            return Err(CheckFailed {
                failed,
                total: self.files.len(),
            }
            .into());
        }
        ok()
    }
}
