//! Port implementations over [`HrApi`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use hrdesk_core::error::CoreError;
use hrdesk_core::ports::{
    EntityDto, EntityPayload, ReferenceItem, ReferenceSource, RemoteEntityStore,
};
use hrdesk_core::types::DbId;

use crate::api::{ApiError, HrApi};
use crate::resource::Resource;

/// [`RemoteEntityStore`] for one REST resource.
#[derive(Debug, Clone)]
pub struct HttpEntityStore {
    api: HrApi,
    resource: Resource,
}

impl HttpEntityStore {
    pub fn new(api: HrApi, resource: Resource) -> Self {
        Self { api, resource }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    fn relation_url(&self, entity_id: DbId, child_id: DbId) -> Result<String, CoreError> {
        self.resource
            .relation_url(self.api.api_url(), entity_id, child_id)
            .ok_or_else(|| {
                CoreError::Internal(format!("{} has no relation collection", self.resource.entity))
            })
    }
}

#[async_trait]
impl RemoteEntityStore for HttpEntityStore {
    async fn fetch_by_id(&self, id: DbId) -> Result<EntityDto, CoreError> {
        let url = self.resource.item_url(self.api.api_url(), id);
        match self.api.get::<Value>(&url).await {
            Ok(body) => Ok(self.resource.entity_from_wire(body)?),
            Err(e) if e.status() == Some(404) => Err(CoreError::NotFound {
                entity: self.resource.entity,
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: DbId, payload: &EntityPayload) -> Result<EntityDto, CoreError> {
        let url = self.resource.item_url(self.api.api_url(), id);
        let body = self.resource.payload_to_wire(payload);
        let response: Value = self.api.put(&url, &body).await?;
        Ok(self.resource.entity_from_wire(response)?)
    }

    async fn create(&self, payload: &EntityPayload) -> Result<EntityDto, CoreError> {
        let url = self.resource.collection_url(self.api.api_url());
        let body = self.resource.payload_to_wire(payload);
        let response: Value = self.api.post(&url, &body).await?;
        let dto = self.resource.entity_from_wire(response)?;
        tracing::info!(entity = self.resource.entity, id = dto.id, "Entity created");
        Ok(dto)
    }

    async fn add_relation(&self, entity_id: DbId, child_id: DbId) -> Result<(), CoreError> {
        let url = self.relation_url(entity_id, child_id)?;
        self.api.post_empty(&url).await?;
        Ok(())
    }

    async fn remove_relation(&self, entity_id: DbId, child_id: DbId) -> Result<(), CoreError> {
        let url = self.relation_url(entity_id, child_id)?;
        self.api.delete(&url).await?;
        Ok(())
    }
}

/// Interviewer as listed by `GET /interviewers?active=true`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterviewerRow {
    id: DbId,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<InterviewerRow> for ReferenceItem {
    fn from(row: InterviewerRow) -> Self {
        let label = row
            .full_name
            .filter(|n| !n.trim().is_empty())
            .or(row.email)
            .unwrap_or_else(|| format!("Interviewer #{}", row.id));
        ReferenceItem { id: row.id, label }
    }
}

/// The list of currently active interviewers a team may reference.
#[derive(Debug, Clone)]
pub struct ActiveInterviewers {
    api: HrApi,
}

impl ActiveInterviewers {
    pub fn new(api: HrApi) -> Self {
        Self { api }
    }

    pub fn url(&self) -> String {
        format!("{}/interviewers?active=true", self.api.api_url())
    }
}

/// Decode an interviewer list body into reference items.
pub fn parse_interviewers(body: Value) -> Result<Vec<ReferenceItem>, ApiError> {
    let rows: Vec<InterviewerRow> = serde_json::from_value(body)
        .map_err(|e| ApiError::Shape(format!("interviewer list: {e}")))?;
    Ok(rows.into_iter().map(ReferenceItem::from).collect())
}

#[async_trait]
impl ReferenceSource for ActiveInterviewers {
    async fn fetch_reference_items(&self) -> Result<Vec<ReferenceItem>, CoreError> {
        let body: Value = self.api.get(&self.url()).await?;
        let items = parse_interviewers(body)?;
        tracing::debug!(count = items.len(), "Fetched active interviewers");
        Ok(items)
    }
}
