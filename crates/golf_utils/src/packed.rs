use crate::{ok, AnyResult};
use anyhow::{bail, ensure};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use glam::{Quat, Vec2, Vec3};
use std::{
    ffi::CString,
    io::{Read, Write},
};

/// Special trait for reading packed data, always assumed to be little endian.
pub trait PackedData: Sized + Clone {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self>;
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult;
}

/// Important note: `read_packed` uses `read_to_end`, so it consumes everything left in the
/// reader. Only use it as the last (or only) member of a bounded payload.
impl PackedData for Vec<u8> {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let mut result = Vec::new();
        r.read_to_end(&mut result)?;
        Ok(result)
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_all(self.as_ref())?;
        ok()
    }
}

impl<T: PackedData, const N: usize> PackedData for [T; N] {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let values = (0..N)
            .map(|_| T::read_packed(r))
            .collect::<AnyResult<Vec<T>>>()?;

        match values.try_into() {
            Ok(array) => Ok(array),
            Err(_) => bail!("array length mismatch"),
        }
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        for value in self {
            value.write_packed(w)?;
        }
        ok()
    }
}

macro_rules! impl_data {
    ($type:ty, $r:ident, $reader:expr, $w:ident, $self:ident, $writer:expr) => {
        impl PackedData for $type {
            fn read_packed<R: Read>($r: &mut R) -> AnyResult<Self> {
                Ok($reader)
            }

            fn write_packed<W: Write>(&self, $w: &mut W) -> AnyResult {
                let $self = self;
                $writer;
                Ok(())
            }
        }
    };
}

impl_data!((), _r, (), _w, _value, ());
impl_data!(u8, r, r.read_u8()?, w, value, w.write_u8(*value)?);
impl_data!(i8, r, r.read_i8()?, w, value, w.write_i8(*value)?);
impl_data!(
    u16,
    r,
    r.read_u16::<LE>()?,
    w,
    value,
    w.write_u16::<LE>(*value)?
);
impl_data!(
    u32,
    r,
    r.read_u32::<LE>()?,
    w,
    value,
    w.write_u32::<LE>(*value)?
);
impl_data!(
    i32,
    r,
    r.read_i32::<LE>()?,
    w,
    value,
    w.write_i32::<LE>(*value)?
);
impl_data!(
    f32,
    r,
    r.read_f32::<LE>()?,
    w,
    value,
    w.write_f32::<LE>(*value)?
);

// Booleans are a single byte. Anything other than 0 or 1 is treated as corrupt data.
impl_data!(
    bool,
    r,
    match r.read_u8()? {
        0 => false,
        1 => true,
        other => bail!("invalid boolean byte {other:#04x}"),
    },
    w,
    value,
    w.write_u8(*value as u8)?
);

impl_data!(
    CString,
    r,
    {
        const SIZE_LIMIT: usize = 8192;
        let mut result = Vec::with_capacity(64);

        loop {
            let next = r.read_u8()?;
            if next == 0 {
                result.push(0);
                break;
            } else if result.len() == SIZE_LIMIT {
                bail!("max C string size ({SIZE_LIMIT} bytes) reached");
            } else {
                result.push(next);
            }
        }

        CString::from_vec_with_nul(result)?
    },
    w,
    value,
    {
        w.write_all(value.as_bytes())?;
        w.write_all(&[0])?;
    }
);

impl_data!(
    Vec2,
    r,
    Vec2::from_array(<[f32; 2]>::read_packed(r)?),
    w,
    value,
    value.to_array().write_packed(w)?
);

impl_data!(
    Vec3,
    r,
    Vec3::from_array(<[f32; 3]>::read_packed(r)?),
    w,
    value,
    value.to_array().write_packed(w)?
);

// Quaternions are stored as xyzw
impl_data!(
    Quat,
    r,
    {
        let [x, y, z, w] = <[f32; 4]>::read_packed(r)?;
        let quat = Quat::from_xyzw(x, y, z, w);
        ensure!(quat.is_finite(), "non-finite quaternion");
        quat
    },
    w,
    value,
    value.to_array().write_packed(w)?
);

/// Trait with a `write_packed` wrapper method for any [`Write`] type, purely for clarity.
pub trait PackedWriteExt {
    /// Writes the specified [`PackedData`] object into this stream.
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult;
}

impl<T: Write> PackedWriteExt for T {
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult {
        t.write_packed(self)
    }
}

/// Trait with a `read_packed` wrapper method for any [`Read`] type, purely for clarity.
pub trait PackedReadExt {
    /// Reads the specified [`PackedData`] type from this stream.
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T>;
}

impl<T: Read> PackedReadExt for T {
    fn read_packed<R: PackedData>(&mut self) -> AnyResult<R> {
        R::read_packed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn little_endian_layout() {
        let mut w = Cursor::new(vec![]);
        w.write_packed(0x11223344u32).unwrap();
        w.write_packed(Vec2::new(0.5, 100.0)).unwrap();
        let bytes = w.into_inner();

        let mut expected = vec![0x44, 0x33, 0x22, 0x11];
        expected.extend(0.5f32.to_le_bytes());
        expected.extend(100f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn quaternion_order_is_xyzw() {
        let mut w = Cursor::new(vec![]);
        w.write_packed(Quat::from_xyzw(0.0, 0.0, 0.0, 1.0)).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[12..16], &1f32.to_le_bytes());

        let quat: Quat = Cursor::new(bytes).read_packed().unwrap();
        assert_eq!(quat, Quat::IDENTITY);
    }

    #[test]
    fn invalid_boolean_is_rejected() {
        assert!(Cursor::new([1u8]).read_packed::<bool>().unwrap());
        assert!(Cursor::new([2u8]).read_packed::<bool>().is_err());
    }

    #[test]
    fn unterminated_c_string_fails() {
        let result = Cursor::new(b"grass".to_vec()).read_packed::<CString>();
        assert!(result.is_err());

        let ok = Cursor::new(b"grass\0tail".to_vec())
            .read_packed::<CString>()
            .unwrap();
        assert_eq!(ok.to_str().unwrap(), "grass");
    }

    #[test]
    fn truncated_array_fails() {
        let bytes = 1f32.to_le_bytes();
        assert!(Cursor::new(bytes).read_packed::<Vec3>().is_err());
    }
}
