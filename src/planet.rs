//! Client for the Planet quick-search and Orders APIs.
use crate::error::{Error, Result};
use crate::request::{OrderRequest, SearchRequest};
use crate::settings::ApiSettings;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use url::Url;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Scene {
    pub id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct SearchLinks {
    #[serde(rename = "_next", default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// One page of quick-search results.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub features: Vec<Scene>,
    #[serde(rename = "_links", default)]
    pub links: SearchLinks,
}

impl SearchResult {
    pub fn ids(&self) -> Vec<String> {
        self.features.iter().map(|f| f.id.to_owned()).collect()
    }
}

/// Order lifecycle state as reported by the Orders API.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum OrderState {
    Queued,
    Running,
    Success,
    Failed,
    Partial,
    Cancelled,
    Unknown(String),
}

impl OrderState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Provider side end states other than success.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Partial | Self::Cancelled)
    }
}

impl From<String> for OrderState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "partial" => Self::Partial,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<OrderState> for String {
    fn from(value: OrderState) -> Self {
        value.to_string()
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
            Self::Unknown(s) => s,
        };
        f.write_str(s)
    }
}

/// A delivered (or undeliverable) file of a finished order.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ResultLink {
    pub location: String,
    pub name: String,
    #[serde(default)]
    pub delivery: String,
}

impl ResultLink {
    pub fn is_delivered(&self) -> bool {
        self.delivery == "success"
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct OrderLinks {
    #[serde(default)]
    pub results: Vec<ResultLink>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub state: OrderState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: OrderLinks,
}

/// Order submission and status. The polling loop only talks to the provider through this.
pub trait OrderApi {
    async fn create_order(&self, order: &OrderRequest) -> Result<Order>;

    async fn get_order(&self, id: &str) -> Result<Order>;
}

/// Fetching the files listed in an order's results.
pub trait AssetApi {
    async fn download_asset(&self, location: &str) -> Result<Response>;
}

pub struct PlanetClient {
    client: Client,
    api_key: String,
    search_url: Url,
    orders_url: Url,
    max_search_pages: usize,
}

impl PlanetClient {
    pub fn new(api_key: &str, settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            search_url: join(&settings.data_url, "quick-search")?,
            orders_url: Url::parse(settings.orders_url.trim_end_matches('/'))?,
            max_search_pages: settings.max_search_pages.max(1),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.api_key, Some(""))
    }

    pub(crate) fn search_request(&self, request: &SearchRequest) -> RequestBuilder {
        self.authed(self.client.post(self.search_url.clone()).json(request))
    }

    pub(crate) fn next_page_request(&self, next: &str) -> RequestBuilder {
        self.authed(self.client.get(next))
    }

    pub(crate) fn create_order_request(&self, order: &OrderRequest) -> RequestBuilder {
        self.authed(self.client.post(self.orders_url.clone()).json(order))
    }

    pub(crate) fn get_order_request(&self, id: &str) -> Result<RequestBuilder> {
        let url = join(self.orders_url.as_str(), id)?;
        Ok(self.authed(self.client.get(url)))
    }

    pub(crate) fn download_request(&self, location: &str) -> RequestBuilder {
        self.authed(self.client.get(location))
    }

    /// Run a quick search and collect the ids of every matching scene, following `_next` links.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<String>> {
        debug!("POST {}", self.search_url);
        let mut page: SearchResult = check_status(self.search_request(request).send().await?)
            .await?
            .json()
            .await?;

        let mut ids = vec![];
        let mut pages = 1;
        loop {
            for id in page.ids() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            let Some(next) = page.links.next.take() else {
                break;
            };
            if pages >= self.max_search_pages {
                info!(
                    "Stopping after {} search pages, more results are available",
                    pages
                );
                break;
            }
            debug!("GET {}", next);
            page = check_status(self.next_page_request(&next).send().await?)
                .await?
                .json()
                .await?;
            pages += 1;
        }

        info!("Search matched {} scene(s)", ids.len());
        if ids.is_empty() {
            return Err(Error::NoScenesFound);
        }
        Ok(ids)
    }
}

impl OrderApi for PlanetClient {
    async fn create_order(&self, order: &OrderRequest) -> Result<Order> {
        debug!("POST {}", self.orders_url);
        let order: Order = check_status(self.create_order_request(order).send().await?)
            .await?
            .json()
            .await?;
        info!("Created order {} ({})", order.id, order.state);
        Ok(order)
    }

    async fn get_order(&self, id: &str) -> Result<Order> {
        let request = self.get_order_request(id)?;
        debug!("GET order {}", id);
        let order: Order = check_status(request.send().await?).await?.json().await?;
        Ok(order)
    }
}

impl AssetApi for PlanetClient {
    async fn download_asset(&self, location: &str) -> Result<Response> {
        debug!("GET {}", location);
        check_status(self.download_request(location).send().await?).await
    }
}

fn join(base: &str, segment: &str) -> Result<Url> {
    let url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), segment))?;
    Ok(url)
}

/// Turn any non-2xx response into [`Error::Transport`] carrying the response body.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Transport {
        status,
        body: body.trim().to_string(),
    })
}
