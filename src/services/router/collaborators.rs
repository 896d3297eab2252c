//! External Collaborators
//!
//! Resources and prompts are served by the host application. The router
//! only forwards `resources/*` and `prompts/list` to these sources.

use async_trait::async_trait;

use nexus_router_core::CoreResult;

use crate::models::{PromptDescriptor, ResourceContents, ResourceDescriptor};

#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn list_resources(&self) -> CoreResult<Vec<ResourceDescriptor>>;

    /// Read one resource. Unknown URIs should fail with `CoreError::NotFound`.
    async fn read_resource(&self, uri: &str) -> CoreResult<ResourceContents>;
}

#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn list_prompts(&self) -> CoreResult<Vec<PromptDescriptor>>;
}
