//! PrivX role-store API client.
//!
//! Every call takes a cancellation token; when it fires, the in-flight request
//! future is dropped (aborting the HTTP exchange) and the call fails with
//! `ConnectorError::Canceled`. Nothing is retried here.

use std::future::Future;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::models::{null_as_default, GrantOutcome, Listing, RemoteRole, RemoteUser, RoleRef};
use crate::auth::{OAuthClient, TokenManager};
use crate::config::Config;
use crate::error::{ApiError, ConnectorError, ConnectorResult};
use crate::pagination::next_token;

/// PrivX role-store API client.
pub struct PrivxClient {
    http_client: Client,
    role_store_url: String,
    tokens: TokenManager,
}

impl PrivxClient {
    /// Create a new client. No network traffic happens until the first call.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.http.timeout())
            .connect_timeout(config.http.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        let oauth_client = OAuthClient::new(config, http_client.clone());

        Ok(Self {
            http_client,
            role_store_url: config.role_store_url(),
            tokens: TokenManager::new(oauth_client),
        })
    }

    /// Exchange the client credentials for an access token to check they are valid.
    #[instrument(skip_all)]
    pub async fn verify_credentials(&self, ctx: &CancellationToken) -> ConnectorResult<()> {
        cancellable(ctx, async {
            self.tokens.verify().await?;
            Ok(())
        })
        .await
    }

    /// Fetch one page of users from the global user list.
    ///
    /// The returned token is empty when this was the last page.
    #[instrument(skip(self, ctx))]
    pub async fn list_users(
        &self,
        ctx: &CancellationToken,
        offset: u64,
        limit: u32,
    ) -> ConnectorResult<Listing<RemoteUser>> {
        let call = "search users".to_string();
        let url = format!("{}/users/search", self.role_store_url);
        let request = self
            .http_client
            .post(&url)
            .query(&PageQuery { offset, limit })
            .json(&UserSearchRequest::default());

        let body: ItemsResponse<RemoteUser> = self.fetch_json(ctx, &call, request).await?;
        Ok(listing(body.items, offset, limit))
    }

    /// Fetch one page of roles.
    #[instrument(skip(self, ctx))]
    pub async fn list_roles(
        &self,
        ctx: &CancellationToken,
        offset: u64,
        limit: u32,
    ) -> ConnectorResult<Listing<RemoteRole>> {
        let call = "list roles".to_string();
        let url = format!("{}/roles", self.role_store_url);
        let request = self
            .http_client
            .get(&url)
            .query(&PageQuery { offset, limit });

        let body: ItemsResponse<RemoteRole> = self.fetch_json(ctx, &call, request).await?;
        Ok(listing(body.items, offset, limit))
    }

    /// Fetch one page of a role's members.
    #[instrument(skip(self, ctx))]
    pub async fn list_role_members(
        &self,
        ctx: &CancellationToken,
        role_id: &str,
        offset: u64,
        limit: u32,
    ) -> ConnectorResult<Listing<RemoteUser>> {
        let call = format!("list members of role {}", role_id);
        let url = format!(
            "{}/roles/{}/members",
            self.role_store_url,
            urlencoding::encode(role_id)
        );
        let request = self
            .http_client
            .get(&url)
            .query(&PageQuery { offset, limit });

        let body: ItemsResponse<RemoteUser> = self.fetch_json(ctx, &call, request).await?;
        Ok(listing(body.items, offset, limit))
    }

    /// Add a role to the user's role list.
    ///
    /// NOTE: the fetch and put are _not_ atomic. A concurrent grant or revoke
    /// on the same user between the two requests can be silently lost.
    #[instrument(skip(self, ctx))]
    pub async fn grant_role(
        &self,
        ctx: &CancellationToken,
        user_id: &str,
        role_id: &str,
    ) -> ConnectorResult<GrantOutcome> {
        let mut roles = self.user_roles(ctx, user_id).await?;

        if roles.iter().any(|r| r.id == role_id) {
            info!("User {} already holds role {}", user_id, role_id);
            return Ok(GrantOutcome::AlreadyPresent);
        }

        roles.push(RoleRef::explicit(role_id));
        self.put_user_roles(
            ctx,
            user_id,
            &roles,
            &format!("grant role {} to user {}", role_id, user_id),
        )
        .await?;

        info!("Granted role {} to user {}", role_id, user_id);
        Ok(GrantOutcome::Applied)
    }

    /// Remove a role from the user's role list.
    ///
    /// NOTE: the fetch and put are _not_ atomic, same as [`PrivxClient::grant_role`].
    #[instrument(skip(self, ctx))]
    pub async fn revoke_role(
        &self,
        ctx: &CancellationToken,
        user_id: &str,
        role_id: &str,
    ) -> ConnectorResult<GrantOutcome> {
        let roles = self.user_roles(ctx, user_id).await?;
        let before = roles.len();
        let remaining: Vec<RoleRef> = roles.into_iter().filter(|r| r.id != role_id).collect();

        if remaining.len() == before {
            info!("User {} does not hold role {}", user_id, role_id);
            return Ok(GrantOutcome::AlreadyAbsent);
        }

        self.put_user_roles(
            ctx,
            user_id,
            &remaining,
            &format!("revoke role {} from user {}", role_id, user_id),
        )
        .await?;

        info!("Revoked role {} from user {}", role_id, user_id);
        Ok(GrantOutcome::Applied)
    }

    async fn user_roles(
        &self,
        ctx: &CancellationToken,
        user_id: &str,
    ) -> ConnectorResult<Vec<RoleRef>> {
        let call = format!("get roles of user {}", user_id);
        let request = self.http_client.get(self.user_roles_url(user_id));

        let body: ItemsResponse<RoleRef> = self.fetch_json(ctx, &call, request).await?;
        Ok(body.items)
    }

    async fn put_user_roles(
        &self,
        ctx: &CancellationToken,
        user_id: &str,
        roles: &[RoleRef],
        call: &str,
    ) -> ConnectorResult<()> {
        let request = self.http_client.put(self.user_roles_url(user_id)).json(roles);

        cancellable(ctx, async {
            self.send(call, request).await?;
            Ok(())
        })
        .await
    }

    fn user_roles_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/roles",
            self.role_store_url,
            urlencoding::encode(user_id)
        )
    }

    /// Send `request` and decode a JSON body, honouring cancellation throughout.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        ctx: &CancellationToken,
        call: &str,
        request: RequestBuilder,
    ) -> ConnectorResult<T> {
        cancellable(ctx, async {
            let response = self.send(call, request).await?;
            let body = response.json::<T>().await.map_err(|e| ApiError::Decode {
                call: call.to_string(),
                message: e.to_string(),
            })?;
            Ok(body)
        })
        .await
    }

    /// Attach the bearer token, send, and map non-2xx statuses to `ApiError::Status`.
    async fn send(&self, call: &str, request: RequestBuilder) -> ConnectorResult<Response> {
        let token = self.tokens.access_token().await?;

        debug!("Calling {}", call);

        let response = request
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|source| ApiError::Network {
                call: call.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("{} failed: HTTP {} - {}", call, status, body);
        Err(ApiError::Status {
            call: call.to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

/// Race `fut` against cancellation of `ctx`.
async fn cancellable<T>(
    ctx: &CancellationToken,
    fut: impl Future<Output = ConnectorResult<T>>,
) -> ConnectorResult<T> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ConnectorError::Canceled),
        result = fut => result,
    }
}

fn listing<T>(items: Vec<T>, offset: u64, limit: u32) -> Listing<T> {
    let next_token = next_token(offset, items.len(), limit);
    Listing { items, next_token }
}

// --- API Request/Response Types ---

#[derive(Debug, Serialize)]
struct PageQuery {
    offset: u64,
    limit: u32,
}

/// Empty search filter: matches every user.
#[derive(Debug, Default, Serialize)]
struct UserSearchRequest {}

/// `{count, items}` envelope used by every role-store list endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    items: Vec<T>,
}
