use std::collections::HashMap;

use crate::types::PolyType;

/// The exported type of an imported package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageType {
    pub name: String,
    pub ty: PolyType,
}

/// Resolves import paths to package types during constraint generation.
pub trait Importer {
    fn import(&self, path: &str) -> Option<PackageType>;
}

/// An importer that knows no packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImports;

impl Importer for NoImports {
    fn import(&self, _path: &str) -> Option<PackageType> {
        None
    }
}

impl Importer for HashMap<String, PackageType> {
    fn import(&self, path: &str) -> Option<PackageType> {
        self.get(path).cloned()
    }
}
