//! Client for the motion planning service.
//!
//! [`PlannerClient`] owns one channel to one planner instance and exposes
//! the two service operations:
//!
//! - [`PlannerClient::submit`] sends a start request; the reply carries
//!   the plan id.
//! - [`PlannerClient::retrieve`] asks for the plan behind an id, either
//!   blocking until it is finished or polling for its current status.
//!
//! The client forwards requests as given. It does not poll, retry or
//! validate; a caller that wants polling issues repeated non-blocking
//! retrieves.
//!
//! # Example
//!
//! ```ignore
//! use motion_planner_client::{ClientConfig, PlannerClient, RetrievePlanRequest};
//!
//! let client = PlannerClient::new(&ClientConfig::insecure("localhost:5050"));
//! let started = client.submit(&start_request).await?;
//! let finished = client.retrieve(&RetrievePlanRequest::blocking(started.id)).await?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::rpc::{JsonRpcChannel, RpcChannel, TransportError};
use crate::wire::{methods, RetrievePlanRequest, RetrievePlanResponse, StartPlanRequest, StartPlanResponse};

/// The two planner operations, named as they appear in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SendStartRequest,
    SendRetrieveRequest,
}

impl Operation {
    /// JSON-RPC method invoked by this operation.
    pub fn method(&self) -> &'static str {
        match self {
            Operation::SendStartRequest => methods::START_PLAN,
            Operation::SendRetrieveRequest => methods::RETRIEVE_PLAN,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SendStartRequest => write!(f, "MotionPlannerClient::SendStartRequest"),
            Operation::SendRetrieveRequest => write!(f, "MotionPlannerClient::SendRetrieveRequest"),
        }
    }
}

/// A planner call did not produce a response.
///
/// The message always names the operation and carries the underlying
/// diagnostic, e.g.
/// `MotionPlannerClient::SendStartRequest: RPC failed with error: Connection failed: ...`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{operation}: RPC failed with error: {source}")]
    Rpc {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("{operation}: failed to encode request: {source}")]
    Encode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: unexpected response from server: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn operation(&self) -> Operation {
        match self {
            ClientError::Rpc { operation, .. }
            | ClientError::Encode { operation, .. }
            | ClientError::Decode { operation, .. } => *operation,
        }
    }

    /// The transport failure, if that is what went wrong.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ClientError::Rpc { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Per-call settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallOptions {
    /// How long to wait for the response. `None` waits until the server
    /// answers or the connection fails.
    pub deadline: Option<Duration>,
}

impl CallOptions {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn without_deadline() -> Self {
        Self { deadline: None }
    }
}

/// Client for one motion planning service instance.
///
/// Methods take `&self`; a client can be shared between tasks. Calls on one
/// client are carried by a single channel.
pub struct PlannerClient<C = JsonRpcChannel> {
    channel: C,
    /// Counter for client-side correlation ids. Starts at 0.
    last_id: AtomicU64,
    submit_deadline: Option<Duration>,
    retrieve_deadline: Option<Duration>,
}

impl PlannerClient<JsonRpcChannel> {
    /// Create a client for the configured endpoint.
    ///
    /// No connection is made until the first call.
    pub fn new(config: &ClientConfig) -> Self {
        tracing::debug!(
            endpoint = %config.endpoint,
            security = %config.security,
            "Creating motion planner client"
        );
        Self::with_channel(JsonRpcChannel::new(config), config)
    }
}

impl<C: RpcChannel> PlannerClient<C> {
    /// Create a client over an existing channel, taking default deadlines
    /// from `config`.
    pub fn with_channel(channel: C, config: &ClientConfig) -> Self {
        Self {
            channel,
            last_id: AtomicU64::new(0),
            submit_deadline: config.submit_deadline(),
            retrieve_deadline: config.retrieve_deadline(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Set the default deadline of [`submit`](Self::submit).
    pub fn set_submit_deadline(&mut self, deadline: Option<Duration>) {
        self.submit_deadline = deadline;
    }

    /// Set the default deadline of [`retrieve`](Self::retrieve).
    pub fn set_retrieve_deadline(&mut self, deadline: Option<Duration>) {
        self.retrieve_deadline = deadline;
    }

    /// Return a new client-local id. Unique within this client instance
    /// only; the server never sees it unless the caller sends it.
    pub fn new_request_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed)
    }

    /// [`new_request_id`](Self::new_request_id) formatted for use as
    /// `StartPlanRequest::id`.
    pub fn new_correlation_id(&self) -> String {
        format!("req-{}", self.new_request_id())
    }

    /// Send a start request with the default submit deadline.
    pub async fn submit(&self, request: &StartPlanRequest) -> Result<StartPlanResponse, ClientError> {
        self.submit_with(
            request,
            CallOptions {
                deadline: self.submit_deadline,
            },
        )
        .await
    }

    /// Send a start request to the planning service.
    ///
    /// On `Ok`, `id` identifies the plan for [`retrieve`](Self::retrieve).
    /// A reply with `success == false` is still returned as `Ok`; the
    /// server's reason is in `msg`.
    pub async fn submit_with(
        &self,
        request: &StartPlanRequest,
        options: CallOptions,
    ) -> Result<StartPlanResponse, ClientError> {
        let response: StartPlanResponse = self
            .invoke(Operation::SendStartRequest, request, options.deadline)
            .await?;

        if response.success {
            tracing::info!(plan_id = %response.id, "Planning request accepted");
        } else {
            tracing::warn!(request_id = %request.id, msg = %response.msg, "Planning request rejected");
        }
        Ok(response)
    }

    /// Send a retrieve request with the default retrieve deadline.
    pub async fn retrieve(&self, request: &RetrievePlanRequest) -> Result<RetrievePlanResponse, ClientError> {
        self.retrieve_with(
            request,
            CallOptions {
                deadline: self.retrieve_deadline,
            },
        )
        .await
    }

    /// Send a retrieve request to the planning service.
    ///
    /// The request's `retrieve_type` and `timeout_ms` are forwarded
    /// untouched. With `BLOCKING` this call does not return until the
    /// server has a terminal answer, the deadline passes, or the
    /// connection fails.
    pub async fn retrieve_with(
        &self,
        request: &RetrievePlanRequest,
        options: CallOptions,
    ) -> Result<RetrievePlanResponse, ClientError> {
        let response: RetrievePlanResponse = self
            .invoke(Operation::SendRetrieveRequest, request, options.deadline)
            .await?;

        tracing::debug!(
            plan_id = %request.id,
            status = response.status.as_str(),
            "Retrieved plan status"
        );
        if !response.success {
            tracing::warn!(plan_id = %request.id, msg = %response.msg, "Plan retrieval unsuccessful");
        }
        Ok(response)
    }

    async fn invoke<Req, Resp>(
        &self,
        operation: Operation,
        request: &Req,
        deadline: Option<Duration>,
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let params = serde_json::to_value(request)
            .map_err(|source| ClientError::Encode { operation, source })?;

        tracing::debug!(%operation, ?deadline, "Sending request to planning service");

        let result = match self.channel.call(operation.method(), params, deadline).await {
            Ok(result) => result,
            Err(source) => {
                tracing::error!(%operation, error = %source, "RPC failed");
                return Err(ClientError::Rpc { operation, source });
            }
        };

        tracing::debug!(%operation, "Successfully sent request to server");

        serde_json::from_value(result).map_err(|source| {
            tracing::error!(%operation, error = %source, "Unexpected response from server");
            ClientError::Decode { operation, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::problem_definition;
    use crate::models::{PlanId, PlanStatus, SystemConf};
    use crate::wire::{Constraints, Params, RetrieveType};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedCall {
        method: String,
        params: serde_json::Value,
        deadline: Option<Duration>,
    }

    // Mock channel answering from a queue of canned results
    #[derive(Default)]
    struct MockChannel {
        calls: Arc<Mutex<Vec<RecordedCall>>>,
        responses: Arc<Mutex<VecDeque<Result<serde_json::Value, TransportError>>>>,
    }

    impl MockChannel {
        fn respond(&self, response: Result<serde_json::Value, TransportError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RpcChannel for MockChannel {
        async fn call(
            &self,
            method: &str,
            params: serde_json::Value,
            deadline: Option<Duration>,
        ) -> Result<serde_json::Value, TransportError> {
            self.calls.lock().unwrap().push(RecordedCall {
                method: method.to_string(),
                params,
                deadline,
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Protocol("no canned response".to_string())))
        }
    }

    fn mock_client() -> PlannerClient<MockChannel> {
        PlannerClient::with_channel(MockChannel::default(), &ClientConfig::insecure("mock:0"))
    }

    fn start_request(robot: &str) -> StartPlanRequest {
        let mut empty = SystemConf::new();
        empty.insert(robot.to_string(), vec![]);
        StartPlanRequest::new(
            "test_id",
            problem_definition("plan", &empty, &empty, Constraints::default(), None),
            Params::new("test-system", "example_geometry", robot),
        )
    }

    #[tokio::test]
    async fn test_submit_returns_plan_id() {
        let client = mock_client();
        client
            .channel()
            .respond(Ok(json!({"id": "plan-0001", "success": true})));

        let response = client.submit(&start_request("robot_arm")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.id, PlanId::from("plan-0001"));

        let calls = client.channel().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "MotionPlanner.HandleStartRequest");
        assert_eq!(calls[0].params["params"]["system_name"], json!("test-system"));
        assert_eq!(calls[0].params["params"]["robot_name"], json!("robot_arm"));
        assert_eq!(
            calls[0].params["problem_def"]["start"]["data"]["robot_arm"]["data"],
            json!([])
        );
        assert_eq!(calls[0].deadline, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_submit_rpc_error_is_reported() {
        let client = mock_client();
        client.channel().respond(Err(TransportError::ServerError {
            code: -32000,
            message: "planner unavailable".to_string(),
            data: None,
        }));

        let err = client.submit(&start_request("robot_arm")).await.unwrap_err();
        assert_eq!(err.operation(), Operation::SendStartRequest);
        assert!(err.transport().is_some());
        assert_eq!(
            err.to_string(),
            "MotionPlannerClient::SendStartRequest: RPC failed with error: \
             Server error -32000: planner unavailable"
        );
    }

    #[tokio::test]
    async fn test_server_rejection_is_not_transport_failure() {
        let client = mock_client();
        client
            .channel()
            .respond(Ok(json!({"id": "", "success": false, "msg": "unknown system"})));

        let response = client.submit(&start_request("robot_arm")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.msg, "unknown system");
    }

    #[tokio::test]
    async fn test_retrieve_forwards_mode_and_timeout() {
        let client = mock_client();
        client
            .channel()
            .respond(Ok(json!({"success": true, "status": "PENDING"})));

        let request = RetrievePlanRequest::non_blocking("plan-0001", Some(250));
        let response = client.retrieve(&request).await.unwrap();
        assert!(response.is_pending());

        let calls = client.channel().calls();
        assert_eq!(calls[0].method, "MotionPlanner.HandleRetrieveRequest");
        let sent: RetrievePlanRequest = serde_json::from_value(calls[0].params.clone()).unwrap();
        assert_eq!(sent, request);
        assert_eq!(sent.retrieve_type, RetrieveType::NonBlocking);
        // Retrieves wait indefinitely unless the caller says otherwise
        assert_eq!(calls[0].deadline, None);
    }

    #[tokio::test]
    async fn test_call_options_override_default_deadline() {
        let client = mock_client();
        client
            .channel()
            .respond(Ok(json!({"success": true, "status": "READY"})));
        client.channel().respond(Ok(json!({"id": "p", "success": true})));

        let deadline = Duration::from_millis(1500);
        let response = client
            .retrieve_with(&RetrievePlanRequest::blocking("p"), CallOptions::with_deadline(deadline))
            .await
            .unwrap();
        assert_eq!(response.status, PlanStatus::Ready);

        client
            .submit_with(&start_request("robot_arm"), CallOptions::without_deadline())
            .await
            .unwrap();

        let deadlines: Vec<_> = client.channel().calls().iter().map(|c| c.deadline).collect();
        assert_eq!(deadlines, vec![Some(deadline), None]);
    }

    #[tokio::test]
    async fn test_unexpected_reply_shape_is_decode_error() {
        let client = mock_client();
        client.channel().respond(Ok(json!({"success": "yes"})));

        let err = client
            .retrieve(&RetrievePlanRequest::blocking("p"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Decode {
                operation: Operation::SendRetrieveRequest,
                ..
            }
        ));
        assert!(err.transport().is_none());
    }

    #[test]
    fn test_request_ids_start_at_zero() {
        let client = mock_client();
        assert_eq!(client.new_request_id(), 0);
        assert_eq!(client.new_request_id(), 1);
        assert_eq!(client.new_correlation_id(), "req-2");
    }

    #[test]
    fn test_request_ids_unique_across_threads() {
        let client = mock_client();
        let ids: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..1000).map(|_| client.new_request_id()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 8000);
        assert_eq!(ids.iter().max(), Some(&7999));
    }

    #[test]
    fn test_client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PlannerClient>();
    }

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::SendStartRequest.method(), "MotionPlanner.HandleStartRequest");
        assert_eq!(
            Operation::SendRetrieveRequest.to_string(),
            "MotionPlannerClient::SendRetrieveRequest"
        );
    }
}
