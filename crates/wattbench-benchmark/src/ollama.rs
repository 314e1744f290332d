use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wattbench_core::{Result, WattbenchError};

/// Generation options forwarded with every request. The standard run fixes
/// these to the policy constants in `wattbench_core::config`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Raw timing fields returned by one generate call. Durations are nanosecond
/// scale; conversion to milliseconds happens in the runner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateStats {
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub load_duration: u64,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub prompt_eval_duration: u64,
    #[serde(default)]
    pub eval_count: u64,
    #[serde(default)]
    pub eval_duration: u64,
}

/// Seam between the run coordinator and the model server.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerateStats>;
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

impl OllamaClient {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server version. Also the reachability pre-check: this failing before a
    /// run starts is the only fatal condition in the pipeline.
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.host);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WattbenchError::Ollama(format!(
                "Version check failed: {}",
                resp.status()
            )));
        }

        let version: VersionResponse = resp
            .json()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;
        Ok(version.version)
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.host);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WattbenchError::Ollama(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pull the benchmark model if it is not already present. Model names are
    /// matched with and without the `:latest` suffix.
    pub async fn ensure_model(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        let base = model.split(':').next().unwrap_or(model);
        let found = models
            .iter()
            .any(|name| name.contains(model) || name.split(':').next() == Some(base));

        if found {
            tracing::info!(model, "model already available");
            return Ok(false);
        }

        tracing::info!(model, "pulling model (first run)");
        self.pull(model).await?;
        Ok(true)
    }

    /// Blocking pull: the request returns once the model is fully downloaded.
    pub async fn pull(&self, model: &str) -> Result<()> {
        let url = format!("{}/api/pull", self.host);
        let request = PullRequest { model, stream: false };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WattbenchError::Ollama(format!(
                "Pull failed: {} - {}",
                status,
                &body[..body.len().min(200)]
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl InferenceEngine for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerateStats> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WattbenchError::Ollama(format!(
                "Generate failed: {} - {}",
                status,
                &body[..body.len().min(500)]
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| WattbenchError::Http(e.to_string()))?;

        let stats: GenerateStats = serde_json::from_str(&body).map_err(|e| {
            WattbenchError::Http(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                &body[..body.len().min(500)]
            ))
        })?;

        Ok(stats)
    }
}
