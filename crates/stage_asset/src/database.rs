//! Asset database: the on-disk index of template documents.
//!
//! The database owns one project root; every template is addressed by its
//! path relative to that root, and the path is what the template's id
//! hashes from. Scene files under the same root are discoverable for
//! whole-project operations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use stage_core::TemplateId;
use stage_scene::{BehaviorRegistry, SCENE_EXTENSION};

use crate::error::{AssetError, Result};
use crate::template::{TemplateAsset, TEMPLATE_EXTENSION};

/// Database of a project's template assets.
pub struct AssetDatabase {
    /// Project root all template paths are relative to
    root: PathBuf,
    /// Loaded templates by id
    templates: HashMap<TemplateId, TemplateAsset>,
    /// Relative path to id lookup
    path_to_id: HashMap<String, TemplateId>,
    /// Whether the index needs a refresh
    dirty: bool,
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

fn validate_rel(path: &str) -> Result<()> {
    let p = Path::new(path);
    if p.is_absolute() || path.split('/').any(|part| part == "..") {
        return Err(AssetError::InvalidPath(p.to_path_buf()));
    }
    Ok(())
}

impl AssetDatabase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: HashMap::new(),
            path_to_id: HashMap::new(),
            dirty: true,
        }
    }

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a project-relative path.
    pub fn abs_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Re-index the project root, loading every template document found.
    /// Returns how many templates loaded; files that fail to parse are
    /// logged and skipped.
    pub fn refresh(&mut self, registry: &BehaviorRegistry) -> usize {
        self.templates.clear();
        self.path_to_id.clear();

        let root = self.root.clone();
        let mut count = 0;
        self.index_directory(&root, registry, &mut count);

        self.dirty = false;
        count
    }

    fn index_directory(&mut self, dir: &Path, registry: &BehaviorRegistry, count: &mut usize) {
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();

                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if name.starts_with('.') {
                    continue;
                }

                if path.is_dir() {
                    self.index_directory(&path, registry, count);
                } else if path
                    .extension()
                    .map(|e| e == TEMPLATE_EXTENSION)
                    .unwrap_or(false)
                {
                    self.index_file(&path, registry, count);
                }
            }
        }
    }

    fn index_file(&mut self, path: &Path, registry: &BehaviorRegistry, count: &mut usize) {
        let Ok(stripped) = path.strip_prefix(&self.root) else {
            return;
        };
        let rel = normalize(&stripped.to_string_lossy());

        match TemplateAsset::load(path, &rel, registry) {
            Ok(asset) => {
                self.insert(asset);
                *count += 1;
            }
            Err(err) => {
                log::warn!("Failed to load template {:?}: {}", path, err);
            }
        }
    }

    /// Add a loaded template to the index.
    pub fn insert(&mut self, asset: TemplateAsset) -> TemplateId {
        let id = asset.id;
        self.path_to_id.insert(asset.path.clone(), id);
        self.templates.insert(id, asset);
        id
    }

    /// Get a template by id.
    pub fn get(&self, id: TemplateId) -> Option<&TemplateAsset> {
        self.templates.get(&id)
    }

    /// Get a mutable template by id.
    pub fn get_mut(&mut self, id: TemplateId) -> Option<&mut TemplateAsset> {
        self.templates.get_mut(&id)
    }

    /// Whether a template is indexed.
    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    /// Find a template id by project-relative path.
    pub fn find_by_path(&self, path: &str) -> Option<TemplateId> {
        self.path_to_id.get(&normalize(path)).copied()
    }

    /// Project-relative path of a template.
    pub fn template_path(&self, id: TemplateId) -> Option<&str> {
        self.templates.get(&id).map(|t| t.path.as_str())
    }

    /// All indexed templates.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateAsset> {
        self.templates.values()
    }

    /// Number of indexed templates.
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Whether the index needs a refresh.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Get the template at a path, loading it from disk or creating an
    /// empty document when none exists yet.
    pub fn load_or_create(&mut self, path: &str, registry: &BehaviorRegistry) -> Result<TemplateId> {
        let rel = normalize(path);
        validate_rel(&rel)?;

        if let Some(id) = self.path_to_id.get(&rel) {
            return Ok(*id);
        }

        let abs = self.abs_path(&rel);
        let asset = if abs.is_file() {
            TemplateAsset::load(&abs, &rel, registry)?
        } else {
            if let Some(parent) = abs.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let asset = TemplateAsset::new(rel.clone());
            asset.save(&abs, registry)?;
            log::info!("Created empty template: {}", rel);
            asset
        };
        Ok(self.insert(asset))
    }

    /// Write a template back to its file.
    pub fn save(&self, id: TemplateId, registry: &BehaviorRegistry) -> Result<()> {
        let template = self
            .templates
            .get(&id)
            .ok_or(AssetError::TemplateNotFound(id))?;
        let abs = self.abs_path(&template.path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        template.save(&abs, registry)
    }

    /// Scene files under the project root, sorted for deterministic
    /// iteration.
    pub fn scene_files(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        collect_scene_files(&self.root, &mut out);
        out.sort();
        out
    }
}

fn collect_scene_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                collect_scene_files(&path, out);
            } else if path
                .extension()
                .map(|e| e == SCENE_EXTENSION)
                .unwrap_or(false)
            {
                out.push(path);
            }
        }
    }
}
