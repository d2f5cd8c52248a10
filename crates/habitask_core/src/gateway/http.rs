//! REST collection gateway.
//!
//! Talks to a JSON collection server laid out as
//! `GET /{collection}?userId=..`, `POST /{collection}`,
//! `PUT /{collection}/{id}` and `DELETE /{collection}/{id}`.

use super::{CollectionGateway, GatewayError, GatewayResult, ListFilter};
use crate::config::ClientConfig;
use crate::model::{Collection, Document, EntityId};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const OWNER_QUERY_KEY: &str = "userId";

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url).map_err(|err| {
            GatewayError::Transport(format!("invalid base url `{base_url}`: {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "base url `{base_url}` cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> GatewayResult<Self> {
        Self::new(&config.api_base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn collection_url(&self, collection: Collection) -> Url {
        self.url_with(&[collection.as_str()])
    }

    /// The id is pushed as one percent-encoded path segment.
    pub fn document_url(&self, collection: Collection, id: &EntityId) -> Url {
        self.url_with(&[collection.as_str(), id.as_str()])
    }

    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            "event=gateway_call module=gateway status=error backend=http http_status={}",
            status.as_u16()
        );
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(transport_error)
    }
}

impl<D: Document> CollectionGateway<D> for HttpGateway {
    async fn list(&self, filter: &ListFilter) -> GatewayResult<Vec<D>> {
        let mut request = self.client.get(self.collection_url(D::COLLECTION));
        if let Some(owner) = &filter.owner_id {
            request = request.query(&[(OWNER_QUERY_KEY, owner.as_str())]);
        }
        let documents: Vec<D> = self.send_json(request).await?;
        debug!(
            "event=gateway_call module=gateway status=ok backend=http op=list collection={} count={}",
            D::COLLECTION,
            documents.len()
        );
        Ok(documents)
    }

    async fn create(&self, document: &D) -> GatewayResult<D> {
        let request = self
            .client
            .post(self.collection_url(D::COLLECTION))
            .json(document);
        self.send_json(request).await
    }

    async fn replace(&self, id: &EntityId, document: &D) -> GatewayResult<D> {
        let request = self
            .client
            .put(self.document_url(D::COLLECTION, id))
            .json(document);
        self.send_json(request).await
    }

    async fn remove(&self, id: &EntityId) -> GatewayResult<()> {
        let request = self.client.delete(self.document_url(D::COLLECTION, id));
        self.send(request).await.map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpGateway;
    use crate::model::{Collection, EntityId};
    use std::time::Duration;

    #[test]
    fn urls_are_built_from_the_base() {
        let gateway = HttpGateway::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.collection_url(Collection::Habits).as_str(),
            "http://localhost:3000/habits"
        );
        assert_eq!(
            gateway
                .document_url(Collection::Statistics, &EntityId::new("9"))
                .as_str(),
            "http://localhost:3000/statistics/9"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let gateway = HttpGateway::new("http://host/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.collection_url(Collection::Tasks).as_str(),
            "http://host/api/tasks"
        );
    }

    #[test]
    fn ids_are_encoded_as_a_single_segment() {
        let gateway = HttpGateway::new("http://localhost:3000", Duration::from_secs(1)).unwrap();
        let url = gateway.document_url(Collection::Tasks, &EntityId::new("a/b?c#d"));
        assert_eq!(url.as_str(), "http://localhost:3000/tasks/a%2Fb%3Fc%23d");
        assert_eq!(url.path_segments().unwrap().count(), 2);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn unparsable_base_is_rejected() {
        assert!(HttpGateway::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpGateway::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }
}
