use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;

use super::{JobApi, RecordSource, StatusResponse, Submission, SubmitResponse};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::record::decode_records;
use crate::sanitize::redact_url;

/// REST client for the record and job endpoints.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpBackend {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        tracing::debug!(base_url = %redact_url(&config.base_url), "Backend client ready");

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn status_endpoint(&self, job_id: &str) -> String {
        self.endpoint(&format!(
            "{}/{}",
            self.config.status_path.trim_end_matches('/'),
            job_id
        ))
    }

    /// Fails with the status code and body text on any non-2xx response.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobApi for HttpBackend {
    async fn submit(&self, submission: Submission) -> Result<String, ApiError> {
        let span = tracing::info_span!(
            "api.submit",
            record_id = %submission.record_id,
            bytes = submission.artifact.len()
        );

        async move {
            let part = Part::bytes(submission.artifact)
                .file_name(submission.filename)
                .mime_str("application/pdf")?;
            let form = Form::new().part("pdf_file", part);
            let folder = submission.group_key.unwrap_or_default();

            let response = self
                .client
                .post(self.endpoint(&self.config.submit_path))
                .query(&[
                    ("project_id", submission.record_id.as_str()),
                    ("folder_name", folder.as_str()),
                ])
                .multipart(form)
                .send()
                .await?;
            let response = Self::check(response).await?;

            let body: SubmitResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            match body.job_id.filter(|id| !id.trim().is_empty()) {
                Some(job_id) => {
                    tracing::info!(job_id = %job_id, "Submission accepted");
                    Ok(job_id)
                }
                None => Err(ApiError::Decode(
                    "submission response carried no job id".to_string(),
                )),
            }
        }
        .instrument(span)
        .await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let response = self
            .client
            .get(self.status_endpoint(job_id))
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl<R> RecordSource<R> for HttpBackend
where
    R: DeserializeOwned + Send + 'static,
{
    async fn fetch_records(&self) -> Result<Vec<R>, ApiError> {
        let span = tracing::info_span!("api.fetch_records");

        async move {
            let response = self
                .client
                .get(self.endpoint(&self.config.records_path))
                .send()
                .await?;
            let response = Self::check(response).await?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            let Value::Array(values) = body else {
                return Err(ApiError::Decode(
                    "record list is not a JSON array".to_string(),
                ));
            };

            let records: Vec<R> = decode_records(values);
            tracing::debug!(count = records.len(), "Fetched records");
            Ok(records)
        }
        .instrument(span)
        .await
    }
}
