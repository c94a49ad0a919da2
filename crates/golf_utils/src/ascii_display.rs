use crate::ok;
use std::fmt::{self, Display};

/// Wrapper type for displaying byte buffers that contain all, or mostly all ASCII text, such as
/// names read out of a level file that turned out not to be valid UTF-8.
///
/// Any non-ASCII bytes are displayed as `\xNN` where `NN` is their hex code. `\` is reinterpreted
/// as `\\`. Its behavior is implemented through the [`Display`] trait.
///
/// ## Example
/// ```
/// # use golf_utils::AsciiDisplay;
/// let a = AsciiDisplay(b"grass");
/// assert_eq!(a.to_string(), "grass");
///
/// let b = AsciiDisplay(b"lm\xAB0\\");
/// assert_eq!(b.to_string(), "lm\\xAB0\\\\");
/// ```
pub struct AsciiDisplay<'a>(pub &'a [u8]);

impl<'a> From<&'a [u8]> for AsciiDisplay<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self(value)
    }
}

impl<'a> Display for AsciiDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0 {
            match byte {
                b'\\' => write!(f, "\\\\")?,
                b' ' => write!(f, " ")?,
                _ if byte.is_ascii_graphic() => write!(f, "{}", byte as char)?,
                _ => write!(f, r"\x{byte:02X}")?,
            }
        }
        ok()
    }
}
