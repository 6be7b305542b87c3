use crate::client::CatalogClient;
use crate::download::file_name_from_href;
use crate::error::{Error, Result};
use crate::extensions::has_label_class;
use crate::search::SearchFilter;
use crate::selection::{AssetChoice, Selection};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use stac::Item;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub href: String,
    pub output: PathBuf,
    /// Set for bulk archive tasks, which are size-checked against the archive info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

impl DownloadTask {
    pub fn new(href: &str, output: PathBuf) -> Self {
        DownloadTask {
            href: href.to_string(),
            output,
            archive: None,
        }
    }

    pub fn archive(collection: &str, href: &str, output: PathBuf) -> Self {
        DownloadTask {
            archive: Some(collection.to_string()),
            ..Self::new(href, output)
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct DownloadPlan {
    pub selection_id: String,
    pub tasks: Vec<DownloadTask>,
}

impl DownloadPlan {
    pub fn new(selection_id: &str, tasks: Vec<DownloadTask>) -> Self {
        Self {
            selection_id: selection_id.to_string(),
            tasks,
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&content)?;
        Ok(plan)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Run the tasks one after another. Outputs that already exist are skipped, so an interrupted
    /// plan can be executed again. Returns the number of files downloaded.
    pub async fn execute<T: Transport>(&self, client: &CatalogClient<T>) -> Result<usize> {
        let mut downloaded = 0;
        for task in self.tasks.iter() {
            println!("Current task: {:?}", task);
            if try_download(client, task).await? {
                downloaded += 1;
            }
        }
        Ok(downloaded)
    }
}

async fn try_download<T: Transport>(client: &CatalogClient<T>, task: &DownloadTask) -> Result<bool> {
    let dst = task.output.as_path();
    if dst.exists() {
        println!("Output file already exists");
        return Ok(false);
    }

    if let Some(parent_dir) = dst.parent() {
        fs::create_dir_all(parent_dir)?;
    }

    match &task.archive {
        Some(collection) => {
            client.download_archive(collection, dst).await?;
        }
        None => {
            println!("Downloading...");
            client.download(&task.href, dst).await?;
            println!("Download complete");
        }
    }
    Ok(true)
}

fn asset_tasks(item: &Item, choices: &[&AssetChoice], dir: &Path) -> Result<Vec<DownloadTask>> {
    choices
        .iter()
        .map(|choice| {
            let asset = item
                .assets
                .get(&choice.key)
                .ok_or_else(|| Error::MissingAsset {
                    item_id: item.id.to_owned(),
                    key: choice.key.to_owned(),
                })?;
            let href = asset.href.to_string();
            let output = dir.join(file_name_from_href(&href, &choice.key));
            Ok(DownloadTask::new(&href, output))
        })
        .collect()
}

/// Walk the selected collection, keep items carrying the selected label class (all items when none
/// is set) up to the limit, and plan one task per chosen asset. Source items are resolved through
/// their `source` links when source assets are chosen. Files land in `output_dir/<item id>/`.
pub async fn generate_download_plan<T: Transport>(
    client: &CatalogClient<T>,
    selection: &Selection,
    output_dir: &Path,
) -> Result<DownloadPlan> {
    let assets = selection.assets_to_download().unwrap_or_default();
    let source_assets = selection.source_assets_to_download();

    let mut cursor = client.search(&SearchFilter::collections(&[&selection.collection]))?;
    let mut tasks: Vec<DownloadTask> = vec![];
    let mut matched = 0;
    let limit = selection.limit.unwrap_or(usize::MAX);

    // Checked before advancing so the cursor never fetches a page the plan won't use
    while matched < limit {
        let Some(item) = cursor.next_item().await? else {
            break;
        };
        if let Some(class) = &selection.label_class {
            if !has_label_class(&item, class) {
                continue;
            }
        }
        matched += 1;

        tasks.extend(asset_tasks(&item, &assets, &output_dir.join(&item.id))?);

        if !source_assets.is_empty() {
            for source in client.source_items(&item).await? {
                let dir = output_dir.join(&item.id).join(&source.id);
                tasks.extend(asset_tasks(&source, &source_assets, &dir)?);
            }
        }
    }

    if selection.archive {
        let output = output_dir.join(format!("{}.tar.gz", selection.collection));
        let href = client.endpoint(&["archive", &selection.collection])?;
        tasks.push(DownloadTask::archive(
            &selection.collection,
            href.as_str(),
            output,
        ));
    }

    Ok(DownloadPlan::new(&selection.id, tasks))
}
