use std::io::{self, Read, Seek, SeekFrom, Take};

/// A very basic implementation of a [`Read`] + [`Seek`] interface that works
/// like [`Take`] does. Seeking is only allowed within the taken range.
#[derive(Debug)]
pub struct SeekableTake<T: Read + Seek> {
    inner: Take<T>,
    start: u64,
    end: u64,
}

impl<T: Read + Seek> SeekableTake<T> {
    fn seek_to(&mut self, target: i128) -> io::Result<u64> {
        if target < self.start as i128 || target > self.end as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seeking outside the SeekableTake range",
            ));
        }

        let target = target as u64;
        self.inner.set_limit(self.end - target);
        self.inner.get_mut().seek(SeekFrom::Start(target))
    }
}

impl<T: Read + Seek> Read for SeekableTake<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<T: Read + Seek> Seek for SeekableTake<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(n) => self.stream_position()? as i128 + n as i128,
            SeekFrom::End(n) => self.end as i128 + n as i128,
        };
        self.seek_to(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        self.inner.get_mut().stream_position()
    }
}

pub trait SeekableTakeExt: Read + Seek {
    /// Limits the reader to the next `n` bytes, while still allowing seeks within them.
    fn seekable_take(&mut self, n: u64) -> io::Result<SeekableTake<&mut Self>>;
}

impl<T: Read + Seek> SeekableTakeExt for T {
    fn seekable_take(&mut self, n: u64) -> io::Result<SeekableTake<&mut Self>> {
        let start = self.stream_position()?;
        let end = start.checked_add(n).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "SeekableTake range overflow")
        })?;

        Ok(SeekableTake {
            inner: self.take(n),
            start,
            end,
        })
    }
}
