use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to pull out of a collection: which items (by label class), which of their assets, and
/// whether to follow source links or grab the bulk archive.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Selection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub assets: Vec<AssetChoice>,
    #[serde(default)]
    pub source_assets: Vec<AssetChoice>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct AssetChoice {
    pub key: String,
    pub name: String,
    pub download: bool,
}

impl Selection {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let selection: Self =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(selection)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        toml::from_str(&table.to_string()).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn assets_to_download(&self) -> Option<Vec<&AssetChoice>> {
        let chosen = chosen(&self.assets);
        if chosen.is_empty() {
            return None;
        }
        Some(chosen)
    }

    /// Empty when source imagery should not be fetched.
    pub fn source_assets_to_download(&self) -> Vec<&AssetChoice> {
        chosen(&self.source_assets)
    }
}

fn chosen(choices: &[AssetChoice]) -> Vec<&AssetChoice> {
    choices.iter().filter(|c| c.download).collect()
}

pub fn selection_template() -> toml::Table {
    toml::toml! {
        id = "crop-type-kenya.maize"

        name = "Maize labels with Sentinel-2 source imagery"

        description = "Crop type labels for western Kenya. Picks label tiles containing the\n\
        Maize class, downloads the label raster and follows each tile's source link to\n\
        fetch the matching Sentinel-2 bands."

        collection = "ref_african_crops_kenya_02_labels"

        label_class = "Maize"

        limit = 2

        archive = false

        [[assets]]
        key = "labels"
        name = "Crop type labels"
        download = true

        [[assets]]
        key = "field_ids"
        name = "Field identifiers"
        download = false

        [[source_assets]]
        key = "B02"
        name = "Blue"
        download = true

        [[source_assets]]
        key = "B03"
        name = "Green"
        download = true

        [[source_assets]]
        key = "B04"
        name = "Red"
        download = true

        [[source_assets]]
        key = "CLD"
        name = "Cloud probability"
        download = false
    }
}
