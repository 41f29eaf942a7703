//! Full sync driver.
//!
//! Plays the orchestrator's part: walks every builder's listing to the empty
//! token, then every resource's entitlements and grants.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::connector::{Entitlement, Grant, Page, Resource, ResourceSyncer, ResourceType};
use crate::error::{ConnectorError, ConnectorResult};
use crate::pagination::PageToken;

/// Everything one sync observed.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub resource_types: Vec<ResourceType>,
    pub resources: Vec<Resource>,
    pub entitlements: Vec<Entitlement>,
    pub grants: Vec<Grant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SyncFailure>,
}

/// A resource type whose sync was abandoned.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub resource_type: &'static str,
    pub error: String,
}

/// Output of syncing one resource type.
struct TypeSync {
    resources: Vec<Resource>,
    entitlements: Vec<Entitlement>,
    grants: Vec<Grant>,
}

pub struct Syncer {
    syncers: Vec<Arc<dyn ResourceSyncer>>,
    page_size: u32,
}

impl Syncer {
    pub fn new(syncers: Vec<Arc<dyn ResourceSyncer>>, page_size: u32) -> Self {
        Self {
            syncers,
            page_size,
        }
    }

    /// Run a full sync.
    ///
    /// A remote failure abandons only the resource type it happened in and is
    /// recorded in [`SyncReport::failures`]. Fatal errors (auth, cancellation)
    /// abort the run.
    pub async fn run(&self, ctx: &CancellationToken) -> ConnectorResult<SyncReport> {
        let mut report = SyncReport::default();

        for syncer in &self.syncers {
            let resource_type = syncer.resource_type();
            report.resource_types.push(resource_type.clone());

            match self.sync_type(ctx, syncer.as_ref()).await {
                Ok(synced) => {
                    info!(
                        "Synced {} {} resources",
                        synced.resources.len(),
                        resource_type.id
                    );
                    report.resources.extend(synced.resources);
                    report.entitlements.extend(synced.entitlements);
                    report.grants.extend(synced.grants);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        resource_type = resource_type.id,
                        error = %e,
                        "Sync of resource type failed"
                    );
                    report.failures.push(SyncFailure {
                        resource_type: resource_type.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Sync finished: {} resources, {} entitlements, {} grants, {} failed types",
            report.resources.len(),
            report.entitlements.len(),
            report.grants.len(),
            report.failures.len()
        );

        Ok(report)
    }

    async fn sync_type(
        &self,
        ctx: &CancellationToken,
        syncer: &dyn ResourceSyncer,
    ) -> ConnectorResult<TypeSync> {
        let resource_type = syncer.resource_type().id;

        let resources = walk(resource_type, self.page_size, |token| async move {
            syncer.list(ctx, None, &token).await
        })
        .await?;

        let mut all_entitlements = Vec::new();
        let mut all_grants = Vec::new();

        for resource in &resources {
            let entitlements = walk(resource_type, self.page_size, |token| async move {
                syncer.entitlements(ctx, resource, &token).await
            })
            .await?;

            let grants = walk(resource_type, self.page_size, |token| async move {
                syncer.grants(ctx, resource, &token).await
            })
            .await?;

            debug!(
                resource = %resource.id,
                entitlements = entitlements.len(),
                grants = grants.len(),
                "Synced resource"
            );

            all_entitlements.extend(entitlements);
            all_grants.extend(grants);
        }

        Ok(TypeSync {
            resources,
            entitlements: all_entitlements,
            grants: all_grants,
        })
    }
}

/// Fetch pages until the returned token is empty.
async fn walk<T, F, Fut>(
    resource_type: &str,
    page_size: u32,
    mut fetch: F,
) -> ConnectorResult<Vec<T>>
where
    F: FnMut(PageToken) -> Fut,
    Fut: Future<Output = ConnectorResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = PageToken::first(page_size);

    loop {
        let page = fetch(token.clone()).await?;
        let last = page.is_last();
        items.extend(page.items);

        if last {
            return Ok(items);
        }

        if page.next_page_token == token.token {
            return Err(ConnectorError::PaginationLoop {
                resource_type: resource_type.to_string(),
                token: page.next_page_token,
            });
        }

        token = token.resume(page.next_page_token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_walk_follows_tokens_until_empty() {
        let seen = Mutex::new(Vec::new());
        let items = walk("user", 2, |token| {
            seen.lock().unwrap().push(token.token.clone());
            async move {
                Ok(match token.token.as_str() {
                    "" => Page::new(vec![1, 2], "2"),
                    "2" => Page::new(vec![3, 4], "4"),
                    _ => Page::new(Vec::new(), ""),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(*seen.lock().unwrap(), vec!["", "2", "4"]);
    }

    #[tokio::test]
    async fn test_walk_detects_repeated_token() {
        let result: ConnectorResult<Vec<u8>> =
            walk("role", 1, |_token| async { Ok(Page::new(vec![1], "5")) }).await;

        assert!(matches!(
            result,
            Err(ConnectorError::PaginationLoop { ref token, .. }) if token == "5"
        ));
    }

    #[tokio::test]
    async fn test_walk_passes_page_size() {
        let items = walk("user", 7, |token| async move {
            assert_eq!(token.size, 7);
            Ok(Page::<u8>::empty())
        })
        .await
        .unwrap();
        assert!(items.is_empty());
    }
}
