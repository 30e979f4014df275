//! Generic CRUD interface for `/api/<resource>` endpoints
//!
//! Morpheus resources share one shape: list responses wrap records in a
//! plural key (`{"certificates": [...], "meta": {...}}`), single records in
//! a singular key (`{"certificate": {...}}`).

use reqwest::Method;
use serde_json::Value;

use super::{ApiClient, Lookup, Reply};
use crate::error::Result;

/// Endpoint and JSON keys of one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Collection path, e.g. `/api/certificates`
    pub path: &'static str,
    /// Key wrapping a single record, e.g. `certificate`
    pub singular: &'static str,
    /// Key wrapping a list, e.g. `certificates`
    pub plural: &'static str,
}

/// CRUD calls against one [`Endpoint`]
pub struct ResourceInterface<'a> {
    client: &'a ApiClient,
    endpoint: Endpoint,
}

impl<'a> ResourceInterface<'a> {
    pub fn new(client: &'a ApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn client(&self) -> &ApiClient {
        self.client
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub async fn list(&self, query: Vec<(String, String)>) -> Result<Reply> {
        let spec = self
            .client
            .request(Method::GET, self.endpoint.path)
            .query(query);
        self.client.execute(spec).await
    }

    pub async fn get(&self, id: u64) -> Result<Reply> {
        let spec = self.client.request(Method::GET, &self.member(id));
        self.client.execute(spec).await
    }

    pub async fn create(&self, body: Value) -> Result<Reply> {
        let spec = self
            .client
            .request(Method::POST, self.endpoint.path)
            .json(body);
        self.client.execute(spec).await
    }

    pub async fn update(&self, id: u64, body: Value) -> Result<Reply> {
        let spec = self.client.request(Method::PUT, &self.member(id)).json(body);
        self.client.execute(spec).await
    }

    pub async fn destroy(&self, id: u64, query: Vec<(String, String)>) -> Result<Reply> {
        let spec = self
            .client
            .request(Method::DELETE, &self.member(id))
            .query(query);
        self.client.execute(spec).await
    }

    /// Fetch one record by id, unwrapped from its singular key
    pub async fn fetch(&self, id: u64) -> Lookup<Reply> {
        let reply: Lookup<Reply> = self.get(id).await.into();
        reply.map(|reply| match reply {
            Reply::Json(mut value) => match value.get_mut(self.endpoint.singular) {
                Some(record) => Reply::Json(record.take()),
                None => Reply::Json(value),
            },
            other => other,
        })
    }

    /// Find a record whose `name` equals `name` exactly
    pub async fn find_by_name(&self, name: &str) -> Lookup<Reply> {
        let query = vec![
            ("name".to_string(), name.to_string()),
            ("max".to_string(), "100".to_string()),
        ];
        match self.list(query).await {
            Ok(Reply::Json(value)) => {
                let found = value
                    .get(self.endpoint.plural)
                    .and_then(Value::as_array)
                    .and_then(|records| {
                        records
                            .iter()
                            .find(|r| r.get("name").and_then(Value::as_str) == Some(name))
                    })
                    .cloned();
                match found {
                    Some(record) => Lookup::Found(Reply::Json(record)),
                    None => Lookup::NotFound,
                }
            }
            Ok(other) => Lookup::Found(other),
            Err(e) => Lookup::from(Err(e)),
        }
    }

    /// Find by numeric id, otherwise by name
    pub async fn find(&self, key: &str) -> Lookup<Reply> {
        match key.parse::<u64>() {
            Ok(id) => self.fetch(id).await,
            Err(_) => self.find_by_name(key).await,
        }
    }

    fn member(&self, id: u64) -> String {
        format!("{}/{}", self.endpoint.path, id)
    }
}

/// Records under `key` in a list response
pub fn records<'v>(response: &'v Value, key: &str) -> &'v [Value] {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
