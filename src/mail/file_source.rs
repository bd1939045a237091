use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::domain::email::EmailRecord;
use crate::error::ConfigError;

const SOURCE_EXTENSION: &str = "txt";

/// A local text file standing in for a single message.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Validates `<source_dir>/<file_name>` without reading it. `file_name`
    /// must be a bare name; paths that would leave `source_dir` are refused.
    pub fn open(source_dir: &Path, file_name: &str) -> Result<Self, ConfigError> {
        let mut parts = Path::new(file_name).components();
        if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
            return Err(ConfigError::NotInSourceDir(file_name.to_string()));
        }
        let path = source_dir.join(file_name);
        if !path.exists() {
            return Err(ConfigError::SourceNotFound(path));
        }
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION));
        if !is_txt {
            return Err(ConfigError::UnsupportedFormat(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file as the body of one record. The subject is the
    /// file stem; date, sender and recipient are left empty.
    pub fn load(&self) -> Result<EmailRecord, ConfigError> {
        let body = fs::read_to_string(&self.path).map_err(|source| ConfigError::SourceRead {
            path: self.path.clone(),
            source,
        })?;
        let subject = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(EmailRecord {
            body,
            subject,
            date: String::new(),
            from: String::new(),
            to: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_body_and_uses_stem_as_subject() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("march orders.txt"), "Order #1 from Jane").unwrap();

        let src = FileSource::open(dir.path(), "march orders.txt").unwrap();
        let record = src.load().unwrap();
        assert_eq!(record.body, "Order #1 from Jane");
        assert_eq!(record.subject, "march orders");
        assert!(record.from.is_empty() && record.to.is_empty() && record.date.is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileSource::open(dir.path(), "nope.txt"),
            Err(ConfigError::SourceNotFound(_))
        ));
    }

    #[test]
    fn names_outside_the_source_dir_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("SOURCE");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(dir.path().join("outside.txt"), "x").unwrap();
        fs::write(source.join("sub/inner.txt"), "x").unwrap();
        let absolute = dir.path().join("outside.txt");

        for name in [absolute.to_str().unwrap(), "../outside.txt", "sub/inner.txt", ".", ""] {
            assert!(
                matches!(
                    FileSource::open(&source, name),
                    Err(ConfigError::NotInSourceDir(_))
                ),
                "{name:?} was accepted"
            );
        }
    }

    #[test]
    fn wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mail.eml"), "x").unwrap();
        assert!(matches!(
            FileSource::open(dir.path(), "mail.eml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
