//! Typed views over the STAC extension fields this client reads: `label:classes` on items,
//! `eo:bands` on assets and the `sci:*` citation fields on collections.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use stac::{Asset, Collection, Item, Link};

pub const SOURCE_REL: &str = "source";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LabelClasses {
    /// `None` when the classes belong to the whole label asset rather than a named property.
    #[serde(default)]
    pub name: Option<String>,
    pub classes: Vec<Value>,
}

impl LabelClasses {
    /// Class values as strings; numeric classes are rendered with their JSON representation.
    pub fn class_names(&self) -> Vec<String> {
        self.classes
            .iter()
            .map(|class| match class {
                Value::String(s) => s.to_owned(),
                other => other.to_string(),
            })
            .collect()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.class_names().iter().any(|c| c == class)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EoBand {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub center_wavelength: Option<f64>,
    #[serde(default)]
    pub full_width_half_max: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Publication {
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScientificCitation {
    pub doi: Option<String>,
    pub citation: Option<String>,
    pub publications: Vec<Publication>,
}

fn extract<D: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<D> {
    let value = fields.get(key)?.clone();
    serde_json::from_value(value).ok()
}

/// Label class groups from `label:classes`. Missing or malformed fields yield an empty list.
pub fn label_classes(item: &Item) -> Vec<LabelClasses> {
    extract(&item.properties.additional_fields, "label:classes").unwrap_or_default()
}

pub fn has_label_class(item: &Item, class: &str) -> bool {
    label_classes(item).iter().any(|group| group.contains(class))
}

pub fn eo_bands(asset: &Asset) -> Vec<EoBand> {
    extract(&asset.additional_fields, "eo:bands").unwrap_or_default()
}

pub fn citation(collection: &Collection) -> ScientificCitation {
    let fields = &collection.additional_fields;
    ScientificCitation {
        doi: extract(fields, "sci:doi"),
        citation: extract(fields, "sci:citation"),
        publications: extract(fields, "sci:publications").unwrap_or_default(),
    }
}

pub fn source_links(item: &Item) -> Vec<&Link> {
    item.links
        .iter()
        .filter(|link| link.rel == SOURCE_REL)
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn item_json(collection: &str, id: &str, classes: &[&str]) -> Value {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": id,
            "collection": collection,
            "geometry": null,
            "properties": {
                "datetime": "2020-06-01T00:00:00Z",
                "label:classes": [{"name": "field_type", "classes": classes}]
            },
            "links": [
                {
                    "rel": "source",
                    "href": format!("https://host/v1/collections/{collection}_source/items/{id}_source")
                },
                {"rel": "self", "href": format!("https://host/v1/collections/{collection}/items/{id}")}
            ],
            "assets": {
                "labels": {
                    "href": format!("https://storage.example.com/{collection}/{id}/labels.tif"),
                    "type": "image/tiff; application=geotiff"
                },
                "B02": {
                    "href": format!("https://storage.example.com/{collection}/{id}/B02.tif"),
                    "eo:bands": [{"name": "B02", "common_name": "blue", "center_wavelength": 0.49}]
                }
            }
        })
    }

    pub fn collection_json(id: &str) -> Value {
        json!({
            "type": "Collection",
            "stac_version": "1.0.0",
            "id": id,
            "description": "Crop type labels",
            "license": "CC-BY-SA-4.0",
            "extent": {
                "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
                "temporal": {"interval": [["2018-01-01T00:00:00Z", null]]}
            },
            "links": [],
            "sci:doi": "10.34911/rdnt.u41j87",
            "sci:citation": "Crop type data, Radiant Earth Foundation (2020)",
            "sci:publications": [{"doi": "10.1000/xyz", "citation": "A paper"}]
        })
    }
}
