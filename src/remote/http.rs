use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{RemoteAccount, RemoteAuthority, RemoteGrant};
use crate::error::{Error, Result};
use crate::types::Principal;

/// Remote authority reached over HTTP with the principal's own credentials.
///
/// `GET {base}/user` resolves the account and `GET {base}/user/permissions`
/// returns a JSON array of grants.
#[derive(Clone)]
pub struct HttpAuthority {
    client: Client,
    base_url: String,
}

impl HttpAuthority {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).bearer_auth(token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Remote(format!("GET {path} returned {status}")));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl RemoteAuthority for HttpAuthority {
    async fn find_account(&self, access_token: &str) -> Result<RemoteAccount> {
        self.get("/user", access_token).await
    }

    async fn fetch_grants(&self, principal: &Principal) -> Result<Vec<RemoteGrant>> {
        self.get("/user/permissions", &principal.token).await
    }
}
