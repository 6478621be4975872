//! Process-wide ambient classpath
//!
//! The only global state in classforge. It is seeded from
//! `CLASSFORGE_CLASSPATH` and read once per context build. Changes go
//! through [`AmbientClasspath::extend_scoped`], whose guard puts the previous
//! value back when dropped, including during unwinding.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::PathBuf;

/// Environment variable seeding the ambient classpath
pub const CLASSPATH_ENV: &str = "CLASSFORGE_CLASSPATH";

static AMBIENT: Lazy<RwLock<Vec<PathBuf>>> = Lazy::new(|| {
    let paths = std::env::var_os(CLASSPATH_ENV)
        .map(|v| std::env::split_paths(&v).collect())
        .unwrap_or_default();
    RwLock::new(paths)
});

/// Accessor for the ambient classpath
#[derive(Debug, Clone, Copy)]
pub struct AmbientClasspath;

impl AmbientClasspath {
    /// Current directories, in order
    #[must_use]
    pub fn snapshot() -> Vec<PathBuf> {
        AMBIENT.read().clone()
    }

    /// Append directories until the returned guard is dropped
    #[must_use = "the classpath is restored as soon as the guard is dropped"]
    pub fn extend_scoped<I>(paths: I) -> AmbientGuard
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let added: Vec<PathBuf> = paths.into_iter().collect();
        let mut current = AMBIENT.write();
        current.extend(added.iter().cloned());
        tracing::debug!("Ambient classpath extended to {} entries", current.len());
        AmbientGuard { added }
    }
}

/// Restores the ambient classpath on drop
#[derive(Debug)]
pub struct AmbientGuard {
    added: Vec<PathBuf>,
}

impl Drop for AmbientGuard {
    // only its own entries; guards on other threads may still be live
    fn drop(&mut self) {
        let mut current = AMBIENT.write();
        for path in self.added.iter().rev() {
            if let Some(pos) = current.iter().rposition(|p| p == path) {
                current.remove(pos);
            }
        }
        tracing::debug!("Ambient classpath restored to {} entries", current.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_on_drop_and_unwind() {
        let before = AmbientClasspath::snapshot();
        {
            let _guard = AmbientClasspath::extend_scoped([PathBuf::from("/extra/a")]);
            let during = AmbientClasspath::snapshot();
            assert_eq!(during.len(), before.len() + 1);
            assert_eq!(during.last(), Some(&PathBuf::from("/extra/a")));
        }
        assert_eq!(AmbientClasspath::snapshot(), before);

        let result = std::panic::catch_unwind(|| {
            let _guard = AmbientClasspath::extend_scoped([PathBuf::from("/extra/b")]);
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(AmbientClasspath::snapshot(), before);
    }
}
