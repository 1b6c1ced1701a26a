// Mock test helpers and common mock patterns
//
// Design Decision: Centralized mock helpers for consistent testing
//
// Discovery tests describe a fake installation as a list of files; the
// helpers below turn that list into a MockFileSystem whose exists(),
// read_to_string() and read_dir() agree with each other.
//
// Usage:
//     use crate::services::mocks::test_helpers::*;
//     let fs = in_memory_filesystem(vec![("/opt/jboss/standalone/configuration/standalone.xml", XML)]);

#[cfg(test)]
pub mod test_helpers {
    use super::super::traits::*;
    use crate::error::ProbeError;
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Create a mock filesystem where nothing exists
    ///
    /// Default behavior:
    /// - exists() returns false
    /// - read_to_string() returns IoError (NotFound)
    /// - read_dir() returns IoError (NotFound)
    pub fn create_mock_filesystem() -> MockFileSystem {
        in_memory_filesystem(Vec::new())
    }

    /// Create a mock filesystem holding `files`
    ///
    /// Every ancestor directory of a listed file exists and lists its
    /// direct children.
    pub fn in_memory_filesystem(files: Vec<(&str, &str)>) -> MockFileSystem {
        let files: Arc<Vec<(PathBuf, String)>> = Arc::new(
            files
                .into_iter()
                .map(|(path, content)| (PathBuf::from(path), content.to_string()))
                .collect(),
        );
        let mut mock = MockFileSystem::new();

        let exists_files = Arc::clone(&files);
        mock.expect_exists().returning(move |path| {
            exists_files.iter().any(|(file, _)| file.starts_with(path))
        });

        let read_files = Arc::clone(&files);
        mock.expect_read_to_string().returning(move |path| {
            read_files
                .iter()
                .find(|(file, _)| file == path)
                .map(|(_, content)| content.clone())
                .ok_or_else(|| not_found(path))
        });

        let dir_files = Arc::clone(&files);
        mock.expect_read_dir().returning(move |path| {
            let children: BTreeSet<PathBuf> = dir_files
                .iter()
                .filter_map(|(file, _)| {
                    let rest = file.strip_prefix(path).ok()?;
                    let first = rest.components().next()?;
                    Some(path.join(first))
                })
                .collect();
            if children.is_empty() {
                Err(not_found(path))
            } else {
                Ok(children.into_iter().collect())
            }
        });

        mock
    }

    fn not_found(path: &Path) -> ProbeError {
        ProbeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        ))
    }

    /// Create a process source returning `processes` on every call
    pub fn create_mock_process_source(processes: Vec<ProcessInfo>) -> MockProcessSource {
        let mut mock = MockProcessSource::new();
        mock.expect_processes().returning(move || processes.clone());
        mock
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use crate::services::traits::{FileSystem, ProcessInfo, ProcessSource};
    use std::path::Path;

    #[tokio::test]
    async fn test_in_memory_filesystem_is_consistent() {
        let fs = in_memory_filesystem(vec![
            ("/opt/jboss/standalone/configuration/standalone.xml", "<server/>"),
            ("/opt/jboss/modules/org/jboss/as/product/eap/module.xml", "<module/>"),
        ]);

        assert!(fs.exists(Path::new("/opt/jboss/standalone")).await);
        assert!(!fs.exists(Path::new("/opt/other")).await);
        assert_eq!(
            fs.read_to_string(Path::new("/opt/jboss/standalone/configuration/standalone.xml"))
                .await
                .unwrap(),
            "<server/>"
        );

        let entries = fs.read_dir(Path::new("/opt/jboss")).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(fs.read_dir(Path::new("/nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_filesystem() {
        let fs = create_mock_filesystem();
        assert!(!fs.exists(Path::new("/")).await);
        assert!(fs.read_to_string(Path::new("/a")).await.is_err());
    }

    #[test]
    fn test_mock_process_source() {
        let source = create_mock_process_source(vec![ProcessInfo::new(7, &["java"])]);
        assert_eq!(source.processes().len(), 1);
        assert_eq!(source.processes()[0].pid, 7);
    }
}
