//! On-disk placement of namespace databases.

use crate::identity::Namespace;
use feedstash_config::CacheConfig;
use std::path::{Path, PathBuf};

/// Folder and database file of one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub folder: PathBuf,
    pub file: PathBuf,
}

impl Location {
    /// Compute `<root>/<folder>/<namespace>.<extension>`.
    ///
    /// Returns `None` when there is no usable root, or when the configured
    /// folder name or extension would not produce a single path component.
    pub fn resolve(config: &CacheConfig, namespace: &Namespace) -> Option<Self> {
        if !is_single_component(&config.folder) || !is_single_component(&config.extension) {
            tracing::debug!(folder = %config.folder, extension = %config.extension, "Invalid cache location");
            return None;
        }
        let folder = config.data_root()?.join(&config.folder);
        let file = folder.join(format!("{namespace}.{}", config.extension));
        Some(Self { folder, file })
    }

    /// Create the folder if it does not exist yet.
    ///
    /// A newly created folder is restricted to its owner (read/write/execute),
    /// which is the user every part of the application runs as. An existing folder is left exactly as it is.
    /// Failures are logged; opening the database will surface them again.
    pub fn prepare(&self) {
        if self.folder.is_dir() {
            return;
        }
        // Use non-async here: runs once per folder on the access queue.
        if let Err(error) = std::fs::create_dir_all(&self.folder) {
            tracing::warn!(path = %self.folder.display(), %error, "Could not create cache folder");
            return;
        }
        tracing::info!(path = %self.folder.display(), "Created cache folder");
        restrict_to_owner(&self.folder);
    }
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(unix)]
fn restrict_to_owner(folder: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(error) = std::fs::set_permissions(folder, std::fs::Permissions::from_mode(0o700)) {
        tracing::warn!(path = %folder.display(), %error, "Could not set cache folder permissions");
    }
}

#[cfg(not(unix))]
fn restrict_to_owner(_folder: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_resolve_default_layout() {
        let config = CacheConfig::with_root("/data");
        let location = Location::resolve(&config, &Namespace::from_identity(5)).unwrap();
        assert_eq!(location.folder, PathBuf::from("/data/ContentCache"));
        assert_eq!(location.file, PathBuf::from("/data/ContentCache/user_5.sqlite"));
    }

    #[test]
    fn test_resolve_custom_names() {
        let mut config = CacheConfig::with_root("/data");
        config.folder = "Offline".to_string();
        config.extension = "db".to_string();
        let location = Location::resolve(&config, &Namespace::from_identity(0)).unwrap();
        assert_eq!(location.file, PathBuf::from("/data/Offline/user_0.db"));
    }

    #[rstest]
    #[case("", "sqlite")]
    #[case("ContentCache", "")]
    #[case("a/b", "sqlite")]
    #[case("..", "sqlite")]
    #[case("ContentCache", "sql/ite")]
    fn test_unresolvable(#[case] folder: &str, #[case] extension: &str) {
        let mut config = CacheConfig::with_root("/data");
        config.folder = folder.to_string();
        config.extension = extension.to_string();
        assert!(Location::resolve(&config, &Namespace::from_identity(1)).is_none());
    }

    #[test]
    fn test_prepare_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::with_root(dir.path().join("nested"));
        let location = Location::resolve(&config, &Namespace::from_identity(1)).unwrap();
        location.prepare();
        assert!(location.folder.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&location.folder).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_leaves_existing_folder_alone() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::with_root(dir.path());
        let location = Location::resolve(&config, &Namespace::from_identity(1)).unwrap();
        std::fs::create_dir(&location.folder).unwrap();
        std::fs::set_permissions(&location.folder, std::fs::Permissions::from_mode(0o750)).unwrap();
        location.prepare();
        let mode = std::fs::metadata(&location.folder).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
