//! The end-to-end tour of a labelled collection: read the collection metadata, find a label item
//! carrying a class, follow it to its source imagery, download the label and band files and
//! optionally the whole archive.
use crate::client::CatalogClient;
use crate::error::Result;
use crate::extensions::{citation, eo_bands, has_label_class, ScientificCitation};
use crate::search::SearchFilter;
use crate::transport::Transport;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Walkthrough {
    pub collection: String,
    pub label_class: String,
    pub label_asset: String,
    /// Band assets to fetch from each source item. Empty means every asset carrying `eo:bands`.
    pub source_assets: Vec<String>,
    pub archive: bool,
}

#[derive(Debug, Default)]
pub struct WalkthroughReport {
    pub description: String,
    pub license: String,
    pub citation: ScientificCitation,
    pub items_scanned: usize,
    /// `None` when no item in the collection carries the label class.
    pub label_item: Option<String>,
    pub source_items: Vec<String>,
    pub downloaded: Vec<PathBuf>,
    pub archive_bytes: Option<u64>,
}

impl Walkthrough {
    pub async fn run<T: Transport>(
        &self,
        client: &CatalogClient<T>,
        dir: &Path,
    ) -> Result<WalkthroughReport> {
        let collection = client.get_collection(&self.collection).await?;
        let mut report = WalkthroughReport {
            description: collection.description.clone(),
            license: collection.license.clone(),
            citation: citation(&collection),
            ..Default::default()
        };

        let mut cursor = client.search(&SearchFilter::collections(&[&self.collection]))?;
        let mut label_item = None;
        while let Some(item) = cursor.next_item().await? {
            report.items_scanned += 1;
            if has_label_class(&item, &self.label_class) {
                label_item = Some(item);
                break;
            }
        }
        let Some(label_item) = label_item else {
            return Ok(report);
        };
        report.label_item = Some(label_item.id.clone());

        let label_dir = dir.join(&label_item.id);
        fs::create_dir_all(&label_dir)?;
        let path = client
            .download_asset(&label_item, &self.label_asset, &label_dir)
            .await?;
        report.downloaded.push(path);

        for source in client.source_items(&label_item).await? {
            let source_dir = label_dir.join(&source.id);
            fs::create_dir_all(&source_dir)?;
            let keys: Vec<String> = if self.source_assets.is_empty() {
                source
                    .assets
                    .iter()
                    .filter(|(_, asset)| !eo_bands(asset).is_empty())
                    .map(|(key, _)| key.to_owned())
                    .collect()
            } else {
                self.source_assets.clone()
            };
            for key in keys {
                let path = client.download_asset(&source, &key, &source_dir).await?;
                report.downloaded.push(path);
            }
            report.source_items.push(source.id);
        }

        if self.archive {
            let path = dir.join(format!("{}.tar.gz", self.collection));
            let bytes = client.download_archive(&self.collection, &path).await?;
            report.archive_bytes = Some(bytes);
            report.downloaded.push(path);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::extensions::fixtures::{collection_json, item_json};
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    fn client(transport: &MockTransport) -> CatalogClient<&MockTransport> {
        let config = ClientConfig::new("secret", "https://host/v1").unwrap();
        CatalogClient::with_transport(config, transport)
    }

    fn walkthrough(archive: bool) -> Walkthrough {
        Walkthrough {
            collection: "crops".to_string(),
            label_class: "Maize".to_string(),
            label_asset: "labels".to_string(),
            source_assets: vec![],
            archive,
        }
    }

    #[tokio::test]
    async fn test_full_walkthrough() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport
            .push_json(&collection_json("crops"))
            .push_json(&json!({
                "type": "FeatureCollection",
                "features": [
                    item_json("crops", "tile_1", &["Rice"]),
                    item_json("crops", "tile_2", &["Maize"]),
                ],
                "links": []
            }))
            .push(200, "labels")
            .push_json(&item_json("crops_source", "tile_2_source", &[]))
            .push(200, "blue band")
            .push_json(&json!({"collection": "crops", "size": 3}))
            .push(200, "tgz");
        let client = client(&transport);

        let report = walkthrough(true).run(&client, dir.path()).await.unwrap();
        assert_eq!(report.license, "CC-BY-SA-4.0");
        assert_eq!(report.items_scanned, 2);
        assert_eq!(report.label_item.as_deref(), Some("tile_2"));
        assert_eq!(report.source_items, vec!["tile_2_source"]);
        assert_eq!(report.archive_bytes, Some(3));
        assert_eq!(
            report.downloaded,
            vec![
                dir.path().join("tile_2/labels.tif"),
                dir.path().join("tile_2/tile_2_source/B02.tif"),
                dir.path().join("crops.tar.gz"),
            ]
        );
        assert_eq!(
            fs::read(dir.path().join("tile_2/tile_2_source/B02.tif")).unwrap(),
            b"blue band"
        );
        assert_eq!(transport.requests().len(), 7);
    }

    #[tokio::test]
    async fn test_no_item_with_class() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.push_json(&collection_json("crops")).push_json(&json!({
            "type": "FeatureCollection",
            "features": [item_json("crops", "tile_1", &["Rice"])],
            "links": []
        }));
        let client = client(&transport);

        let report = walkthrough(false).run(&client, dir.path()).await.unwrap();
        assert!(report.label_item.is_none());
        assert!(report.downloaded.is_empty());
    }
}
