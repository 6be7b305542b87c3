use crate::client::CatalogClient;
use crate::error::Result;
use crate::extensions::source_links;
use crate::search::{ItemCursor, SearchFilter};
use crate::transport::Transport;
use stac::{Collection, Item};

impl<T: Transport> CatalogClient<T> {
    /// `GET /collections/{id}`. An unknown id is reported as [Error::NotFound](crate::Error::NotFound).
    pub async fn get_collection(&self, id: &str) -> Result<Collection> {
        let url = self.endpoint(&["collections", id])?;
        self.get_json(url.as_str()).await
    }

    pub async fn get_item(&self, collection: &str, id: &str) -> Result<Item> {
        let url = self.endpoint(&["collections", collection, "items", id])?;
        self.get_json(url.as_str()).await
    }

    /// Start a search. Nothing is sent until the cursor is first advanced.
    pub fn search(&self, filter: &SearchFilter) -> Result<ItemCursor<'_, T>> {
        let mut url = self.resolve("search")?;
        filter.apply(&mut url);
        Ok(ItemCursor::new(self, url))
    }

    /// Follow every `source` link of `item`, in link order.
    pub async fn source_items(&self, item: &Item) -> Result<Vec<Item>> {
        let mut items = vec![];
        for link in source_links(item) {
            let source: Item = self.get_json(&link.href.to_string()).await?;
            items.push(source);
        }
        Ok(items)
    }
}
