//! Various utilities shared by the golf level crates

pub mod packed;

mod pool;
pub use pool::*;

mod arc_pool;
pub use arc_pool::*;

mod ascii_display;
pub use ascii_display::*;

mod result_ext;
pub use result_ext::AnyhowResultExt;

mod seekable_take;
pub use seekable_take::{SeekableTake, SeekableTakeExt};

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Used by the [`golf_proc::ext_repr`] proc macro, returned when a raw value doesn't name any
/// variant of the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid {type_name} value {value}")]
pub struct EnumParseError {
    /// Name of the enum that failed to parse.
    pub type_name: &'static str,
    /// The rejected raw value. Strings that fail to parse are reported as `u64::MAX`.
    pub value: u64,
}
