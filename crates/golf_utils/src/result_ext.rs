use crate::AnyResult;
use anyhow::anyhow;
use std::{error::Error, fmt::Display, path::Path};

/// Attaches human readable context to results and options, turning them into [`AnyResult`]s.
pub trait AnyhowResultExt<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T>;

    /// Same as [`Self::otherwise`], with a message in the form of `couldn't <action> <path>`.
    fn for_path(self, action: &str, path: &Path) -> AnyResult<T>
    where
        Self: Sized,
    {
        self.otherwise(format_args!("couldn't {action} `{}`", path.display()))
    }
}

impl<T, E: Error + Send + Sync + 'static> AnyhowResultExt<T> for Result<T, E> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.map_err(|e| anyhow::Error::from(e).context(s.to_string()))
    }
}

impl<T> AnyhowResultExt<T> for Option<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.ok_or_else(|| anyhow!("{s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::AnyhowResultExt;
    use std::{io, path::Path};

    #[test]
    fn context_is_attached() {
        let result: Result<(), io::Error> = Err(io::ErrorKind::NotFound.into());
        let error = result.for_path("read", Path::new("hole1.glvl")).unwrap_err();
        assert_eq!(error.to_string(), "couldn't read `hole1.glvl`");
        assert!(error.downcast_ref::<io::Error>().is_some());

        let missing: Option<u32> = None;
        assert_eq!(missing.otherwise("nothing").unwrap_err().to_string(), "nothing");
    }
}
