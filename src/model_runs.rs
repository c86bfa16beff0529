//! Model-run listing through the external model API
//!
//! The model API is searched once per request with the caller's session
//! token; only runs that have finished are reported back, reduced to their
//! identifiers.

use crate::errors::{PrmsError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `progress_state` of a run whose outputs are available.
pub const PROGRESS_FINISHED: &str = "FINISHED";

/// A model run as returned by the model API search.
///
/// The `id` is passed through as the API sent it, string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    pub id: Value,
    pub progress_state: String,
}

/// The part of a model run exposed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRunSummary {
    pub id: Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    objects: Vec<ModelRun>,
}

/// Source of model runs
#[async_trait]
pub trait ModelRunSearch {
    /// List every model run visible to the session.
    async fn search_modelruns(&self) -> Result<Vec<ModelRun>>;
}

/// HTTP client for the model API, authenticated with a session API token.
#[derive(Debug, Clone)]
pub struct ModelApiClient {
    client: Client,
    api_key: String,
    model_host: String,
}

impl ModelApiClient {
    pub fn new(api_key: &str, model_host: &str) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model_host: model_host.trim_end_matches('/').to_string(),
        })
    }

    pub fn model_host(&self) -> &str {
        &self.model_host
    }

    fn modelruns_url(&self) -> String {
        format!("{}/api/modelruns", self.model_host)
    }
}

#[async_trait]
impl ModelRunSearch for ModelApiClient {
    async fn search_modelruns(&self) -> Result<Vec<ModelRun>> {
        let url = self.modelruns_url();

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("JWT {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PrmsError::UpstreamStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let body: SearchResponse = response.json().await?;
        tracing::debug!(url = %url, runs = body.objects.len(), "Searched model runs");

        Ok(body.objects)
    }
}

/// Keeps only finished runs, reduced to their identifiers.
pub fn finished_model_runs(runs: &[ModelRun]) -> Vec<ModelRunSummary> {
    runs.iter()
        .filter(|run| run.progress_state == PROGRESS_FINISHED)
        .map(|run| ModelRunSummary { id: run.id.clone() })
        .collect()
}

/// Lists the finished runs of any model run source.
pub async fn list_finished_model_runs<S>(search: &S) -> Result<Vec<ModelRunSummary>>
where
    S: ModelRunSearch + Sync + ?Sized,
{
    let runs = search.search_modelruns().await?;
    Ok(finished_model_runs(&runs))
}

/// Searches the model API with `api_token` and returns the finished runs as JSON.
///
/// The token was issued by the session layer's auth service; only the model
/// API is contacted here.
pub async fn model_run_name(api_token: &str, model_host: &str) -> Result<String> {
    let client = ModelApiClient::new(api_token, model_host)?;
    let finished = list_finished_model_runs(&client).await?;
    Ok(serde_json::to_string(&finished)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(id: &str, state: &str) -> ModelRun {
        ModelRun {
            id: json!(id),
            progress_state: state.to_string(),
        }
    }

    struct FixedRuns(Vec<ModelRun>);

    #[async_trait]
    impl ModelRunSearch for FixedRuns {
        async fn search_modelruns(&self) -> Result<Vec<ModelRun>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_only_finished_runs_are_kept() {
        let runs = vec![
            run("a", "FINISHED"),
            run("b", "RUNNING"),
            run("c", "QUEUED"),
            run("d", "FINISHED"),
            run("e", "ERROR"),
            run("f", "finished"),
        ];

        let finished = finished_model_runs(&runs);
        let ids: Vec<&Value> = finished.iter().map(|r| &r.id).collect();
        assert_eq!(ids, vec![&json!("a"), &json!("d")]);
    }

    #[test]
    fn test_summary_json_has_only_id() {
        let json = serde_json::to_string(&finished_model_runs(&[run("x1", "FINISHED")])).unwrap();
        assert_eq!(json, r#"[{"id":"x1"}]"#);
    }

    #[tokio::test]
    async fn test_list_finished_model_runs_from_source() {
        let source = FixedRuns(vec![run("1", "RUNNING"), run("2", "FINISHED")]);
        let finished = list_finished_model_runs(&source).await.unwrap();
        assert_eq!(
            finished,
            vec![ModelRunSummary { id: json!("2") }]
        );
    }

    #[test]
    fn test_numeric_ids_pass_through() {
        let body = r#"{"objects": [
            {"id": 17, "progress_state": "FINISHED", "title": "baseline"},
            {"id": 18, "progress_state": "RUNNING"},
            {"id": "a1", "progress_state": "FINISHED"}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();

        let json = serde_json::to_string(&finished_model_runs(&response.objects)).unwrap();
        assert_eq!(json, r#"[{"id":17},{"id":"a1"}]"#);
    }

    #[test]
    fn test_client_urls_are_normalised() {
        let client = ModelApiClient::new("token", "http://model/").unwrap();
        assert_eq!(client.model_host(), "http://model");
        assert_eq!(client.modelruns_url(), "http://model/api/modelruns");
    }
}
