//! HTTP client for a running `capplan serve` instance.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::RecordStore;
use crate::dataset::model::WorkingDataset;
use crate::error::{CapError, CapResult};
use crate::quarter::model::{Quarter, QuarterRecord, QuarterSummary, QuarterUpdate};

/// A [`RecordStore`] speaking to the REST API under `<base_url>/api`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<base_url>/api/<segments...>`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> CapResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CapError::Config(format!("invalid API URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| CapError::Config(format!("API URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Send a request; `Ok(None)` on 404, an error on any other failure.
    async fn send(&self, request: RequestBuilder) -> CapResult<Option<Response>> {
        let response = request
            .send()
            .await
            .map_err(|e| CapError::transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(CapError::validation(body))
            }
            StatusCode::CONFLICT => Err(CapError::invalid_state(body)),
            _ => Err(CapError::transport(format!("{}: {}", status, body))),
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> CapResult<T> {
        response
            .json()
            .await
            .map_err(|e| CapError::transport(format!("unreadable response: {}", e)))
    }

    /// Send a request expecting a quarter record; 404 means `id` is unknown.
    async fn quarter(&self, id: &str, request: RequestBuilder) -> CapResult<Quarter> {
        let response = self
            .send(request)
            .await?
            .ok_or_else(|| CapError::QuarterNotFound(id.to_string()))?;
        Quarter::from_record(Self::json::<QuarterRecord>(response).await?)
    }
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn list_quarters(&self) -> CapResult<Vec<QuarterSummary>> {
        let response = self
            .send(self.client.get(self.url(&["quarters"])?))
            .await?
            .ok_or_else(|| CapError::transport("quarter listing not available"))?;
        Self::json(response).await
    }

    async fn get_active_quarter(&self) -> CapResult<Option<Quarter>> {
        match self.send(self.client.get(self.url(&["quarters", "active"])?)).await? {
            Some(response) => {
                let record: QuarterRecord = Self::json(response).await?;
                Quarter::from_record(record).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn get_quarter(&self, id: &str) -> CapResult<Quarter> {
        let request = self.client.get(self.url(&["quarters", id])?);
        self.quarter(id, request).await
    }

    async fn create_quarter(&self, name: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        let request = self
            .client
            .post(self.url(&["quarters"])?)
            .json(&json!({ "name": name, "data": data }));
        let response = self
            .send(request)
            .await?
            .ok_or_else(|| CapError::transport("quarter creation not available"))?;
        Quarter::from_record(Self::json::<QuarterRecord>(response).await?)
    }

    async fn update_quarter(&self, id: &str, update: QuarterUpdate) -> CapResult<Quarter> {
        let mut body = serde_json::Map::new();
        if let Some(name) = update.name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(data) = update.data {
            body.insert("data".to_string(), serde_json::to_value(data)?);
        }
        let request = self
            .client
            .put(self.url(&["quarters", id])?)
            .json(&body);
        self.quarter(id, request).await
    }

    async fn activate_quarter(&self, id: &str) -> CapResult<Quarter> {
        let request = self.client.post(self.url(&["quarters", id, "activate"])?);
        self.quarter(id, request).await
    }

    async fn delete_quarter(&self, id: &str) -> CapResult<()> {
        let request = self.client.delete(self.url(&["quarters", id])?);
        self.send(request)
            .await?
            .ok_or_else(|| CapError::QuarterNotFound(id.to_string()))?;
        Ok(())
    }

    async fn set_baseline(&self, id: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        let request = self
            .client
            .post(self.url(&["quarters", id, "baseline"])?)
            .json(&json!({ "data": data }));
        self.quarter(id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let store = HttpStore::new("http://localhost:3030/");
        assert_eq!(
            store.url(&["quarters"]).unwrap().as_str(),
            "http://localhost:3030/api/quarters"
        );
        let prefixed = HttpStore::new("http://localhost:3030/planner");
        assert_eq!(
            prefixed.url(&["quarters", "q1", "activate"]).unwrap().as_str(),
            "http://localhost:3030/planner/api/quarters/q1/activate"
        );
    }

    #[test]
    fn test_ids_are_percent_encoded() {
        let store = HttpStore::new("http://localhost:3030");
        assert_eq!(
            store.url(&["quarters", "a/b c?x#y"]).unwrap().as_str(),
            "http://localhost:3030/api/quarters/a%2Fb%20c%3Fx%23y"
        );
    }

    #[test]
    fn test_invalid_base_url_is_a_config_error() {
        let store = HttpStore::new("not a url");
        assert!(matches!(store.url(&["quarters"]), Err(CapError::Config(_))));
    }
}
