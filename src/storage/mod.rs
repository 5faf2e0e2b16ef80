//! Storage scope selection for extraction and highlighting delegators
//!
//! Interactive-authoring runs read from permanent storage, automated tool
//! runs from temporary storage. The choice is made once per call from the
//! execution source; the core retrieval/compile/complete path never
//! touches file storage.

use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::ExecutionSource;

/// Storage durability class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Permanent,
    Temporary,
}

/// Bound storage handle used by extraction/highlighting delegators
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// Local filesystem store
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Holds the configured permanent and temporary stores and selects the
/// scope for an execution source
#[derive(Clone)]
pub struct StorageProvider {
    permanent: Arc<dyn FileStore>,
    temporary: Arc<dyn FileStore>,
}

impl StorageProvider {
    pub fn new(permanent: Arc<dyn FileStore>, temporary: Arc<dyn FileStore>) -> Self {
        Self {
            permanent,
            temporary,
        }
    }

    /// Both scopes backed by the local filesystem
    pub fn local() -> Self {
        let store = Arc::new(LocalFileStore);
        Self {
            permanent: store.clone(),
            temporary: store,
        }
    }

    /// Store for an explicit storage class
    pub fn class(&self, class: StorageClass) -> Arc<dyn FileStore> {
        match class {
            StorageClass::Permanent => self.permanent.clone(),
            StorageClass::Temporary => self.temporary.clone(),
        }
    }

    /// Store bound to the scope an execution source reads from
    pub fn scope_for(&self, source: ExecutionSource) -> Arc<dyn FileStore> {
        match source {
            ExecutionSource::Ide => self.permanent.clone(),
            ExecutionSource::Tool => self.temporary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_local_store_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "extracted text").unwrap();

        let store = LocalFileStore;
        assert!(store.exists(file.path()));
        assert_eq!(store.read_to_string(file.path()).unwrap(), "extracted text");
    }

    #[test]
    fn test_local_store_missing_file() {
        let store = LocalFileStore;
        let path = Path::new("/nonexistent/extract/file.txt");
        assert!(!store.exists(path));
        assert!(store.read_to_string(path).is_err());
    }

    #[test]
    fn test_scope_selection() {
        let provider = StorageProvider::local();
        // Both scopes resolve; selection itself must not branch elsewhere
        let _ide = provider.scope_for(ExecutionSource::Ide);
        let _tool = provider.scope_for(ExecutionSource::Tool);
        let _perm = provider.class(StorageClass::Permanent);
        let _temp = provider.class(StorageClass::Temporary);
    }
}
