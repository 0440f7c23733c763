//! Stimulus catalogs
//!
//! A catalog maps category -> subcategory -> image paths. Catalogs are read
//! from a folder tree `<root>/<category>/<subcategory>/<image>`, matching the
//! way image sets are shipped with the study, or from a JSON listing when the
//! images live elsewhere.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{AatError, Result};
use crate::core::types::Category;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StimulusSet {
    pub name: String,
    pub images: IndexMap<Category, IndexMap<String, Vec<String>>>,
}

impl StimulusSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            images: IndexMap::new(),
        }
    }

    /// Builder-style insertion, mostly for fixtures
    pub fn with_subcategory(
        mut self,
        category: Category,
        subcategory: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        self.images
            .entry(category)
            .or_default()
            .insert(subcategory.into(), images);
        self
    }

    /// Load from `<root>/<category>/<subcategory>/<image>`
    ///
    /// Subcategories and images are sorted by name so that a catalog is the
    /// same on every machine. Unknown category folders are ignored.
    pub fn from_folder(name: impl Into<String>, root: &Path) -> Result<Self> {
        let name = name.into();
        if !root.is_dir() {
            return Err(AatError::Config(format!(
                "{}: stimulus folder {:?} does not exist",
                name, root
            )));
        }

        let mut set = StimulusSet::new(name);
        for category in Category::ALL {
            let category_dir = root.join(category.as_str());
            if !category_dir.is_dir() {
                continue;
            }

            let mut subcategories = sorted_entries(&category_dir)?
                .into_iter()
                .filter(|p| p.is_dir())
                .collect::<Vec<_>>();
            subcategories.sort();

            let entry = set.images.entry(category).or_default();
            for sub_dir in subcategories {
                let sub_name = file_name(&sub_dir);
                let images = sorted_entries(&sub_dir)?
                    .into_iter()
                    .filter(|p| is_image(p))
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .collect::<Vec<_>>();
                entry.insert(sub_name, images);
            }
        }

        set.validate()?;
        tracing::debug!("{}: loaded {} images", set.name, set.len());
        Ok(set)
    }

    /// Load set `name` under `root`: `<root>/<name>.json` if present, else the folder
    pub fn load(name: &str, root: &Path) -> Result<Self> {
        let listing = root.join(format!("{}.json", name));
        if listing.is_file() {
            let set = Self::from_json(&fs::read_to_string(&listing)?)?;
            tracing::debug!("{}: loaded {} images from {:?}", set.name, set.len(), listing);
            return Ok(set);
        }
        Self::from_folder(name, &root.join(name))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let set: StimulusSet = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AatError::Config("A stimulus set needs a name".into()));
        }
        if self.is_empty() {
            return Err(AatError::Config(format!("{}: contains no images", self.name)));
        }
        Ok(())
    }

    pub fn subcategories(&self, category: Category) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.images.get(&category).into_iter().flat_map(|subs| subs.iter())
    }

    pub fn subcategory(&self, category: Category, subcategory: &str) -> Option<&[String]> {
        self.images
            .get(&category)?
            .get(subcategory)
            .map(Vec::as_slice)
    }

    /// Every image of a category, subcategories in catalog order
    pub fn all_images(&self, category: Category) -> Vec<String> {
        self.subcategories(category)
            .flat_map(|(_, imgs)| imgs.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.images
            .values()
            .flat_map(|subs| subs.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The catalogs a study draws from
#[derive(Debug, Clone)]
pub struct StimulusCatalog {
    /// Pre/post assessment only
    pub set_a: StimulusSet,
    /// Pre/post assessment, mini-AAT and training for everyone
    pub set_b: StimulusSet,
    /// Training images for conditions without personalization
    pub standard: StimulusSet,
    /// Pool the personalization panels are drawn from
    pub personalization: StimulusSet,
}

impl StimulusCatalog {
    /// Load the four sets `set_a`, `set_b`, `standard` and `personalization` under `root`
    pub fn from_root(root: &Path) -> Result<Self> {
        Ok(Self {
            set_a: StimulusSet::load("set_a", root)?,
            set_b: StimulusSet::load("set_b", root)?,
            standard: StimulusSet::load("standard", root)?,
            personalization: StimulusSet::load("personalization", root)?,
        })
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
