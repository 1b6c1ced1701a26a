//! Product flavour of an installation
//!
//! Products ship a module under `org/jboss/as/product/<slot>`; the
//! community distribution ships only the `main` slot.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ProbeError, Result};
use crate::services::FileSystem;

const PRODUCT_MODULE_DIRS: &[&str] = &[
    "modules/org/jboss/as/product",
    "modules/system/layers/base/org/jboss/as/product",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// Community distribution
    As,
    Eap,
    Edg,
}

impl ProductType {
    pub fn short_name(&self) -> &'static str {
        match self {
            ProductType::As => "AS",
            ProductType::Eap => "EAP",
            ProductType::Edg => "JDG",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            ProductType::As => "JBoss Application Server 7",
            ProductType::Eap => "JBoss Enterprise Application Platform 6",
            ProductType::Edg => "JBoss Data Grid 6",
        }
    }

    fn from_slot(slot: &str) -> Option<Self> {
        match slot {
            "eap" => Some(ProductType::Eap),
            "edg" => Some(ProductType::Edg),
            _ => None,
        }
    }

    /// Inspect the product module directories of the installation at `home`
    ///
    /// # Errors
    /// - a product directory exists but cannot be listed
    /// - more than one product slot is installed
    pub async fn determine(fs: &dyn FileSystem, home: &Path) -> Result<Self> {
        let mut found = Vec::new();
        for dir in PRODUCT_MODULE_DIRS {
            let dir = home.join(dir);
            if !fs.exists(&dir).await {
                continue;
            }
            let entries = fs.read_dir(&dir).await.map_err(|e| {
                ProbeError::Discovery(format!("cannot read product directory {}: {}", dir.display(), e))
            })?;
            for entry in entries {
                let slot = entry
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if slot == "main" {
                    continue;
                }
                match Self::from_slot(&slot) {
                    Some(product) if !found.contains(&product) => found.push(product),
                    Some(_) => {}
                    None => tracing::debug!("Ignoring unknown product slot [{}]", slot),
                }
            }
        }

        match found.as_slice() {
            [] => Ok(ProductType::As),
            [product] => Ok(*product),
            _ => Err(ProbeError::Discovery(format!(
                "more than one product installed under {}: {:?}",
                home.display(),
                found
            ))),
        }
    }
}
