use crate::client::CatalogClient;
use crate::error::Result;
use crate::transport::Transport;
use futures_util::stream::{self, Stream};
use stac::{Item, ItemCollection};
use std::collections::VecDeque;
use url::Url;

pub const NEXT_REL: &str = "next";

/// Query parameters for `GET /search`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub collections: Vec<String>,
    pub ids: Vec<String>,
    pub limit: Option<u64>,
    pub bbox: Option<[f64; 4]>,
    pub datetime: Option<String>,
}

impl SearchFilter {
    pub fn collections<S: AsRef<str>>(collections: &[S]) -> Self {
        Self {
            collections: collections.iter().map(|c| c.as_ref().to_owned()).collect(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if !self.collections.is_empty() {
            pairs.append_pair("collections", &self.collections.join(","));
        }
        if !self.ids.is_empty() {
            pairs.append_pair("ids", &self.ids.join(","));
        }
        if let Some(limit) = self.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
        if let Some(bbox) = self.bbox {
            let bbox = bbox.map(|v| v.to_string()).join(",");
            pairs.append_pair("bbox", &bbox);
        }
        if let Some(datetime) = &self.datetime {
            pairs.append_pair("datetime", datetime);
        }
    }
}

/// Lazily walks the pages of a search. Holds the current page and the link to the next one; a new
/// request is only sent once the buffered page has been consumed.
pub struct ItemCursor<'a, T: Transport> {
    client: &'a CatalogClient<T>,
    buffer: VecDeque<Item>,
    next: Option<Url>,
    pages_fetched: usize,
}

impl<'a, T: Transport> ItemCursor<'a, T> {
    pub(crate) fn new(client: &'a CatalogClient<T>, first_page: Url) -> Self {
        Self {
            client,
            buffer: VecDeque::new(),
            next: Some(first_page),
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The next item, or `None` once the last page is exhausted.
    pub async fn next_item(&mut self) -> Result<Option<Item>> {
        // Loop so that an empty page followed by a next link doesn't end the walk early
        while self.buffer.is_empty() {
            let Some(url) = self.next.take() else {
                return Ok(None);
            };
            self.fetch_page(url).await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn fetch_page(&mut self, url: Url) -> Result<()> {
        let page: ItemCollection = self.client.get_json(url.as_str()).await?;
        self.pages_fetched += 1;
        self.next = page
            .links
            .iter()
            .find(|link| link.rel == NEXT_REL)
            .map(|link| self.client.resolve(&link.href.to_string()))
            .transpose()?;
        self.buffer.extend(page.items);
        Ok(())
    }

    /// Drain every remaining page into memory.
    pub async fn collect_all(mut self) -> Result<Vec<Item>> {
        let mut items = vec![];
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Item>> + 'a {
        stream::try_unfold(self, |mut cursor| async move {
            let item = cursor.next_item().await?;
            Ok(item.map(|item| (item, cursor)))
        })
    }
}
