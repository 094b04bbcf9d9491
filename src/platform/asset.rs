// Asset lookup through the plugin host's registration context
use std::path::{Path, PathBuf};

use crate::error::{KeepAliveError, Result};

/// Opaque registration context handed to us by the plugin host.
///
/// The controller never inspects it; it only forwards it to the
/// [`AssetResolver`].
pub trait PluginRegistrar: Send + Sync {
    /// Map a logical asset name of a package to a key relative to
    /// [`asset_root`](Self::asset_root).
    fn lookup_key_for_asset(&self, asset: &str, package: &str) -> String;

    /// Directory the host ships its bundled assets in.
    fn asset_root(&self) -> PathBuf;
}

/// Registrar for hosts that lay bundled package assets out as
/// `packages/<package>/<asset>` under one resource directory.
#[derive(Debug, Clone)]
pub struct BundleRegistrar {
    root: PathBuf,
}

impl BundleRegistrar {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PluginRegistrar for BundleRegistrar {
    fn lookup_key_for_asset(&self, asset: &str, package: &str) -> String {
        let asset = asset.trim_start_matches('/');
        if package.is_empty() {
            asset.to_string()
        } else {
            format!("packages/{package}/{asset}")
        }
    }

    fn asset_root(&self) -> PathBuf {
        self.root.clone()
    }
}

/// Resolves a logical asset name to a readable file.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, asset: &str, package: &str, registrar: &dyn PluginRegistrar) -> Result<PathBuf>;
}

/// Looks the registrar's key up on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundleAssetResolver;

impl AssetResolver for BundleAssetResolver {
    fn resolve(&self, asset: &str, package: &str, registrar: &dyn PluginRegistrar) -> Result<PathBuf> {
        let key = registrar.lookup_key_for_asset(asset, package);
        let path = registrar.asset_root().join(key);

        if path.is_file() {
            Ok(path)
        } else {
            Err(KeepAliveError::AssetNotFound {
                asset: asset.to_string(),
                path,
            })
        }
    }
}
