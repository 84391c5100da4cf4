//! Executes a monitor, resolving its chain of previous steps first.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::assertion::Assertion;
use super::template::{TemplateError, resolve_template};
use crate::db::enums::BodyType;
use crate::db::models::{ExecutionResult, KeyValue, MonitorDetails, STATUS_NO_RESPONSE};
use crate::db::store::MonitorStore;

/// Longest chain of monitors (root included) that may be resolved for one execution.
pub const MAX_CHAIN_DEPTH: usize = 10;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
enum PreparedBody {
    Empty,
    Form(Vec<(String, String)>),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
struct PreparedRequest {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: PreparedBody,
}

struct StepOutcome {
    monitor_name: Option<String>,
    result: ExecutionResult,
}

#[derive(Clone)]
pub struct ProbeExecutor {
    store: Arc<dyn MonitorStore>,
    client: reqwest::Client,
}

impl ProbeExecutor {
    pub fn new(store: Arc<dyn MonitorStore>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(store, client))
    }

    pub fn with_client(store: Arc<dyn MonitorStore>, client: reqwest::Client) -> Self {
        Self { store, client }
    }

    /// Runs the monitor and every previous step it depends on.
    ///
    /// Never fails: problems are recorded in the returned result's error text.
    #[instrument(skip(self))]
    pub async fn execute(&self, monitor_id: i32) -> ExecutionResult {
        self.execute_step(monitor_id, Vec::new()).await.result
    }

    fn execute_step(&self, monitor_id: i32, mut chain: Vec<i32>) -> BoxFuture<'_, StepOutcome> {
        async move {
            let mut result = ExecutionResult::pending(monitor_id);
            let details = match self.store.get_monitor_details(monitor_id).await {
                Ok(details) => details,
                Err(e) => {
                    warn!(monitor_id, error = %e, "Failed to load monitor.");
                    result.log_error = e.to_string();
                    return StepOutcome {
                        monitor_name: None,
                        result,
                    };
                }
            };
            let monitor_name = Some(details.monitor.name.clone());

            chain.push(monitor_id);
            let is_root = chain.len() == 1;

            let mut predecessor: Option<ExecutionResult> = None;
            let mut context: Option<Value> = None;
            if let Some(previous_id) = details.monitor.previous_step_id {
                if chain.len() >= MAX_CHAIN_DEPTH {
                    result.log_error = format!(
                        "depth limit of previous step reached (maximum: {MAX_CHAIN_DEPTH})"
                    );
                    return StepOutcome { monitor_name, result };
                }
                if chain.contains(&previous_id) {
                    result.log_error =
                        "request aborted due to recursion of monitor steps".to_string();
                    return StepOutcome { monitor_name, result };
                }

                let previous = self.execute_step(previous_id, chain).await;
                if !previous.result.success {
                    result.status_code = previous.result.status_code;
                    result.log_response = previous.result.log_response;
                    result.log_error = format!(
                        "error on previous step: `{}`\n`{}`",
                        previous.monitor_name.unwrap_or_default(),
                        previous.result.log_error
                    );
                    return StepOutcome { monitor_name, result };
                }
                context = serde_json::from_str(&previous.result.log_response).ok();
                predecessor = Some(previous.result);
            }

            let prepared = match prepare_request(&details, context.as_ref()) {
                Ok(prepared) => prepared,
                Err(e) => {
                    if let Some(previous) = predecessor {
                        result.status_code = previous.status_code;
                        result.log_response = previous.log_response;
                    }
                    result.log_error = format!("error while preparing monitor params: `{e}`");
                    return StepOutcome { monitor_name, result };
                }
            };

            self.send(&details, prepared, &mut result).await;

            if is_root && result.status_code != STATUS_NO_RESPONSE {
                let assertion = Assertion::for_monitor(&details.monitor, &details.excluded_keys);
                if let Err(e) = assertion.check(&result.log_response) {
                    result.success = false;
                    result.log_error = e.to_string();
                }
            }

            StepOutcome { monitor_name, result }
        }
        .boxed()
    }

    async fn send(
        &self,
        details: &MonitorDetails,
        prepared: PreparedRequest,
        result: &mut ExecutionResult,
    ) {
        let monitor = &details.monitor;
        let mut request = self
            .client
            .request(monitor.method.into(), &monitor.url)
            .query(&prepared.query);
        for (key, value) in prepared.headers {
            request = request.header(key, value);
        }
        request = match prepared.body {
            PreparedBody::Empty => request,
            PreparedBody::Form(fields) => request.form(&fields),
            PreparedBody::Raw(body) => request.body(body),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(monitor_id = monitor.id, error = %e, "Probe request failed.");
                result.log_error = e.to_string();
                return;
            }
        };

        let status = response.status();
        result.status_code = i32::from(status.as_u16());
        result.success = status.is_success();
        match response.bytes().await {
            Ok(bytes) => result.log_response = decode_lossy(&bytes),
            Err(e) => {
                result.success = false;
                result.log_error = e.to_string();
            }
        }
    }
}

fn resolve_pairs(
    pairs: &[KeyValue],
    context: Option<&Value>,
) -> Result<Vec<(String, String)>, TemplateError> {
    pairs
        .iter()
        .map(|pair| {
            Ok((
                resolve_template(&pair.key, context)?,
                resolve_template(&pair.value, context)?,
            ))
        })
        .collect()
}

fn prepare_request(
    details: &MonitorDetails,
    context: Option<&Value>,
) -> Result<PreparedRequest, TemplateError> {
    let headers = resolve_pairs(&details.headers, context)?;
    let query = resolve_pairs(&details.query_params, context)?;
    let body = match details.monitor.body_type {
        BodyType::Empty => PreparedBody::Empty,
        BodyType::Form => PreparedBody::Form(resolve_pairs(&details.body_form, context)?),
        BodyType::Raw => {
            let raw = details.raw_body.as_deref().unwrap_or_default();
            PreparedBody::Raw(resolve_template(raw, context)?)
        }
    };
    Ok(PreparedRequest {
        headers,
        query,
        body,
    })
}

/// Decodes a response body as UTF-8, dropping invalid byte sequences.
fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
