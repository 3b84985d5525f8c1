use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{PostalLocation, RequestContext, provider::truncate_body};

use super::LocalityResolver;

pub const DEFAULT_BASE_URL: &str = "https://viacep.com.br/ws";

/// Locality lookup backed by ViaCEP (`GET {base}/{cep}/json`).
#[derive(Debug, Clone)]
pub struct ViaCepResolver {
    base_url: String,
    http: Client,
}

impl ViaCepResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url.into())
    }

    pub fn with_client(http: Client, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn endpoint(&self, code: &str) -> String {
        format!("{}/{}/json", self.base_url, code)
    }

    async fn fetch(&self, code: &str) -> Result<PostalLocation> {
        let res = self
            .http
            .get(self.endpoint(code))
            .send()
            .await
            .context("Failed to send request to ViaCEP")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read ViaCEP response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "ViaCEP request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        if body.trim().is_empty() {
            debug!(code, "ViaCEP returned an empty body");
            return Ok(PostalLocation::default());
        }

        let parsed: Option<VcResponse> =
            serde_json::from_str(&body).context("Failed to parse ViaCEP JSON")?;

        let locality = parsed.and_then(|r| r.localidade).unwrap_or_default();
        Ok(PostalLocation::new(locality))
    }
}

/// Only the field we need. ViaCEP answers `{"erro": true}` for unknown codes; that,
/// a `null` body and `"localidade": null` all decode to an empty locality.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VcResponse {
    localidade: Option<String>,
}

#[async_trait]
impl LocalityResolver for ViaCepResolver {
    async fn resolve(&self, ctx: &RequestContext, code: &str) -> Result<PostalLocation> {
        ctx.run("ViaCEP lookup", self.fetch(code)).await
    }
}
