use std::sync::Arc;

use crate::client::routes;
use crate::context::SdkContext;
use crate::dto::{Entity, EntityList};
use crate::error::Result;
use crate::query::QueryBuilder;

/// Workspace-scoped entity collection access (pipelines, ci_builds, ...).
pub struct EntitiesService {
    ctx: Arc<SdkContext>,
}

impl EntitiesService {
    pub fn new(ctx: Arc<SdkContext>) -> Self {
        Self { ctx }
    }

    /// Queries a collection and returns one page of entities.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` when no workspace is configured; entity
    /// collections only exist inside a workspace.
    pub async fn query(&self, collection: &str, query: &QueryBuilder) -> Result<Vec<Entity>> {
        let list: EntityList = self.ctx.rest().get_json(&self.path(collection, query)?).await?;
        Ok(list.data)
    }

    /// Creates entities in a collection.
    pub async fn create(&self, collection: &str, entities: &[Entity]) -> Result<()> {
        #[derive(serde::Serialize)]
        struct Envelope<'a> {
            data: &'a [Entity],
        }

        let path = self.path(collection, &QueryBuilder::new())?;
        self.ctx.rest().post_json(&path, &Envelope { data: entities }).await
    }

    fn path(&self, collection: &str, query: &QueryBuilder) -> Result<String> {
        let config = self.ctx.config();
        let mut path = routes::expand(
            routes::ENTITIES,
            &[
                ("shared_space", &routes::encode(&config.shared_space)),
                ("workspace", &routes::encode(config.require_workspace()?)),
                ("collection", &routes::encode(collection)),
            ],
        );
        let tail = query.build();
        if !tail.is_empty() {
            path.push('?');
            path.push_str(&tail);
        }
        Ok(path)
    }
}
