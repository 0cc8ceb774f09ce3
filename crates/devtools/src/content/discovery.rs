use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Document;
use thiserror::Error;

use crate::AppPaths;

use super::types::SourcePack;

pub const PACK_METADATA_FILE: &str = "About.xml";
pub const DEFS_DIR_NAME: &str = "Defs";

#[derive(Debug, Clone, Default)]
pub struct ContentLoadRequest {
    pub enabled_packs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("enabled pack id cannot be empty")]
    EmptyEnabledPack,
    #[error("duplicate enabled pack id in request: {pack_id}")]
    DuplicateEnabledPack { pack_id: String },
    #[error("enabled pack does not exist on disk: {pack_id} at {expected_dir}")]
    EnabledPackMissing {
        pack_id: String,
        expected_dir: PathBuf,
    },
    #[error("failed to read pack metadata {path}: {source}")]
    ReadMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed pack metadata {path}: {source}")]
    MalformedMetadata {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct PackSource {
    pub dir_name: String,
    pub load_index: u32,
    pub defs_dir: PathBuf,
    /// `None` for the core content, which has no owning pack.
    pub pack: Option<SourcePack>,
}

pub(crate) fn discover_pack_sources(
    app_paths: &AppPaths,
    request: &ContentLoadRequest,
) -> Result<Vec<PackSource>, DiscoveryError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = vec![PackSource {
        dir_name: "core".to_string(),
        load_index: 0,
        defs_dir: app_paths.core_content_dir.join(DEFS_DIR_NAME),
        pack: None,
    }];

    for (idx, pack_id) in request.enabled_packs.iter().enumerate() {
        let trimmed = pack_id.trim();
        if trimmed.is_empty() {
            return Err(DiscoveryError::EmptyEnabledPack);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(DiscoveryError::DuplicateEnabledPack {
                pack_id: trimmed.to_string(),
            });
        }
        let pack_dir = app_paths.packs_dir.join(trimmed);
        if !pack_dir.is_dir() {
            return Err(DiscoveryError::EnabledPackMissing {
                pack_id: trimmed.to_string(),
                expected_dir: pack_dir,
            });
        }
        let pack = read_pack_metadata(trimmed, &pack_dir)?;
        sources.push(PackSource {
            dir_name: trimmed.to_string(),
            load_index: (idx + 1) as u32,
            defs_dir: pack_dir.join(DEFS_DIR_NAME),
            pack: Some(pack),
        });
    }

    Ok(sources)
}

/// Reads `About.xml` when present; the directory name stands in for a
/// missing package id.
fn read_pack_metadata(dir_name: &str, pack_dir: &Path) -> Result<SourcePack, DiscoveryError> {
    let path = pack_dir.join(PACK_METADATA_FILE);
    if !path.is_file() {
        return Ok(SourcePack {
            package_id: dir_name.to_string(),
            name: None,
        });
    }

    let raw = fs::read_to_string(&path).map_err(|source| DiscoveryError::ReadMetadata {
        path: path.clone(),
        source,
    })?;
    let doc = Document::parse(&raw).map_err(|source| DiscoveryError::MalformedMetadata {
        path: path.clone(),
        source,
    })?;

    let field = |name: &str| {
        doc.root_element()
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == name)
            .and_then(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    };

    Ok(SourcePack {
        package_id: field("packageId").unwrap_or_else(|| dir_name.to_string()),
        name: field("name"),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn app_paths(root: &Path) -> AppPaths {
        AppPaths {
            root: root.to_path_buf(),
            core_content_dir: root.join("assets").join("core"),
            packs_dir: root.join("packs"),
        }
    }

    #[test]
    fn core_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(&paths.core_content_dir).expect("core");
        fs::create_dir_all(paths.packs_dir.join("b")).expect("pack b");
        fs::create_dir_all(paths.packs_dir.join("a")).expect("pack a");
        let request = ContentLoadRequest {
            enabled_packs: vec!["b".to_string(), "a".to_string()],
        };

        let sources = discover_pack_sources(&paths, &request).expect("discover");
        assert_eq!(sources[0].dir_name, "core");
        assert!(sources[0].pack.is_none());
        assert_eq!(sources[1].dir_name, "b");
        assert_eq!(sources[2].dir_name, "a");
        assert_eq!(sources[2].load_index, 2);
        assert_eq!(
            sources[1].pack.as_ref().expect("pack").package_id,
            "b".to_string()
        );
    }

    #[test]
    fn metadata_supplies_name_and_package_id() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        let pack_dir = paths.packs_dir.join("glitter");
        fs::create_dir_all(&pack_dir).expect("pack");
        fs::write(
            pack_dir.join(PACK_METADATA_FILE),
            "<ModMetaData><name>Glitter Tech</name><packageId>author.glitter</packageId></ModMetaData>",
        )
        .expect("about");

        let sources = discover_pack_sources(
            &paths,
            &ContentLoadRequest {
                enabled_packs: vec!["glitter".to_string()],
            },
        )
        .expect("discover");
        let pack = sources[1].pack.as_ref().expect("pack");
        assert_eq!(pack.package_id, "author.glitter");
        assert_eq!(pack.display_name(), "Glitter Tech");
    }

    #[test]
    fn missing_and_duplicate_packs_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(paths.packs_dir.join("a")).expect("pack a");

        let missing = discover_pack_sources(
            &paths,
            &ContentLoadRequest {
                enabled_packs: vec!["ghost".to_string()],
            },
        )
        .expect_err("missing");
        assert!(matches!(missing, DiscoveryError::EnabledPackMissing { .. }));

        let duplicate = discover_pack_sources(
            &paths,
            &ContentLoadRequest {
                enabled_packs: vec!["a".to_string(), " a ".to_string()],
            },
        )
        .expect_err("duplicate");
        assert!(matches!(
            duplicate,
            DiscoveryError::DuplicateEnabledPack { .. }
        ));
    }
}
