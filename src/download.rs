use crate::client::CatalogClient;
use crate::error::{check_status, Error, Result};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use stac::Item;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// Response of `GET /archive/{collection}/info`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    pub collection: String,
    /// Size of the archive in bytes.
    pub size: u64,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Last path segment of `href`, falling back to `default` when there is none.
pub fn file_name_from_href(href: &str, default: &str) -> String {
    let name = match Url::parse(href) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned)),
        Err(_) => Path::new(href)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    };
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

impl<T: Transport> CatalogClient<T> {
    /// GET `href` and write the whole body to `destination`, replacing any existing file. The body
    /// is streamed into `<destination>.partial` first, which is removed again if anything fails.
    /// The parent directory must already exist. Returns the number of bytes written.
    pub async fn download(&self, href: &str, destination: &Path) -> Result<u64> {
        let response = check_status(self.get(href).await?).await?;

        let partial = partial_path(destination);
        let result = async {
            let byte_count = write_body(response, &partial).await?;
            fs::rename(&partial, destination)?;
            Ok::<u64, Error>(byte_count)
        }
        .await;
        if result.is_err() {
            let _ = fs::remove_file(&partial);
        }
        result
    }

    /// Download the asset stored under `key` in `item` into `dir`, naming the file after the last
    /// segment of the asset href.
    pub async fn download_asset(&self, item: &Item, key: &str, dir: &Path) -> Result<PathBuf> {
        let asset = item.assets.get(key).ok_or_else(|| Error::MissingAsset {
            item_id: item.id.to_owned(),
            key: key.to_owned(),
        })?;
        let href = asset.href.to_string();
        let destination = dir.join(file_name_from_href(&href, key));
        println!("Downloading {} ({}) to {}", key, item.id, destination.display());
        self.download(&href, &destination).await?;
        Ok(destination)
    }

    pub async fn archive_info(&self, collection: &str) -> Result<ArchiveInfo> {
        let url = self.endpoint(&["archive", collection, "info"])?;
        self.get_json(url.as_str()).await
    }

    /// Download the bulk archive of `collection` and check its size against the archive info.
    /// On a size mismatch the written file is removed.
    pub async fn download_archive(&self, collection: &str, destination: &Path) -> Result<u64> {
        let info = self.archive_info(collection).await?;
        println!(
            "Downloading archive for {} ({} bytes)...",
            info.collection, info.size
        );
        let url = self.endpoint(&["archive", collection])?;
        let byte_count = self.download(url.as_str(), destination).await?;

        if byte_count != info.size {
            fs::remove_file(destination)?;
            return Err(Error::SizeMismatch {
                expected: info.size,
                actual: byte_count,
            });
        }
        println!("Download complete");
        Ok(byte_count)
    }
}

async fn write_body(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path)?;
    let mut byte_count = 0_u64;
    while let Some(bytes) = response.chunk().await? {
        file.write_all(&bytes)?;
        byte_count += bytes.len() as u64;
    }
    file.flush()?;
    Ok(byte_count)
}
