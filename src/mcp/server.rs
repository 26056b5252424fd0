use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    task::{self, AbortHandle, JoinError, JoinSet},
};

use crate::{
    core::advisor::ChargingAdvisor,
    mcp::{
        protocol::{
            CallToolParams,
            CallToolResult,
            CancelledParams,
            ErrorObject,
            Message,
            RequestId,
            Response,
            initialize_result,
        },
        tools::{self, Tool},
    },
    prelude::*,
};

pub struct Server {
    advisor: Arc<ChargingAdvisor>,
}

/// Tool calls still running, each one cancellable by its request ID.
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<CallToolResult>,
    requests: HashMap<task::Id, RequestId>,
    handles: HashMap<RequestId, AbortHandle>,
}

impl Server {
    pub fn new(advisor: ChargingAdvisor) -> Self {
        Self { advisor: Arc::new(advisor) }
    }

    /// Serve requests until the input is closed.
    ///
    /// Tool calls run concurrently with reading, so that a call may be cancelled.
    /// Calls still running at the end of the input are awaited.
    #[instrument(skip_all)]
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("serving…");
        let mut lines = input.lines();
        let mut in_flight = InFlight::default();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read the input")? else {
                        break;
                    };
                    if let Some(response) = self.handle_line(&line, &mut in_flight) {
                        write_message(&mut output, &response).await?;
                    }
                }

                Some(joined) = in_flight.tasks.join_next_with_id() => {
                    if let Some(response) = in_flight.on_joined(joined) {
                        write_message(&mut output, &response).await?;
                    }
                }
            }
        }

        info!(n_pending = in_flight.handles.len(), "input closed, finishing the pending calls…");
        while let Some(joined) = in_flight.tasks.join_next_with_id().await {
            if let Some(response) = in_flight.on_joined(joined) {
                write_message(&mut output, &response).await?;
            }
        }
        Ok(())
    }

    fn handle_line(&self, line: &str, in_flight: &mut InFlight) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let message = match serde_json::from_str::<Value>(line) {
            Ok(value) => match serde_json::from_value::<Message>(value) {
                Ok(message) => message,
                Err(error) => {
                    warn!(%error, "invalid request");
                    return Some(Response::error(None, ErrorObject::invalid_request(&error)));
                }
            },
            Err(error) => {
                warn!(%error, "malformed message");
                return Some(Response::error(None, ErrorObject::parse_error(&error)));
            }
        };
        debug!(method = %message.method, id = ?message.id, "received");

        let Some(id) = message.id else {
            self.handle_notification(&message.method, message.params, in_flight);
            return None;
        };
        match message.method.as_str() {
            "initialize" => Some(Response::result(id, initialize_result())),
            "ping" => Some(Response::result(id, json!({}))),
            "tools/list" => {
                Some(Response::result(id, json!({ "tools": Tool::ALL.map(Tool::definition) })))
            }
            "tools/call" => match serde_json::from_value::<CallToolParams>(message.params) {
                Ok(params) => self.spawn_call(id, params, in_flight),
                Err(error) => Some(Response::error(Some(id), ErrorObject::invalid_params(&error))),
            },
            method => Some(Response::error(Some(id), ErrorObject::method_not_found(method))),
        }
    }

    fn handle_notification(&self, method: &str, params: Value, in_flight: &mut InFlight) {
        match method {
            "notifications/cancelled" => match serde_json::from_value::<CancelledParams>(params) {
                Ok(params) => {
                    if let Some(handle) = in_flight.handles.remove(&params.request_id) {
                        handle.abort();
                        info!(request_id = ?params.request_id, reason = ?params.reason, "cancelled");
                    }
                }
                Err(error) => warn!(%error, "invalid cancellation"),
            },
            "notifications/initialized" => info!("client initialized"),
            _ => debug!(method, "ignored notification"),
        }
    }

    /// Start the call in the background, the response is written when it finishes.
    fn spawn_call(
        &self,
        id: RequestId,
        params: CallToolParams,
        in_flight: &mut InFlight,
    ) -> Option<Response> {
        if in_flight.handles.contains_key(&id) {
            warn!(?id, "request ID is already in flight");
            return Some(Response::error(Some(id), ErrorObject::duplicate_id()));
        }
        let advisor = Arc::clone(&self.advisor);
        let handle = in_flight
            .tasks
            .spawn(async move { tools::call(&advisor, &params.name, params.arguments).await });
        in_flight.requests.insert(handle.id(), id.clone());
        in_flight.handles.insert(id, handle);
        None
    }
}

impl InFlight {
    /// Forget the finished call and build its response, unless it has been cancelled.
    fn on_joined(
        &mut self,
        joined: Result<(task::Id, CallToolResult), JoinError>,
    ) -> Option<Response> {
        let task_id = match &joined {
            Ok((task_id, _)) => *task_id,
            Err(error) => error.id(),
        };
        let id = self.requests.remove(&task_id)?;
        if self.handles.get(&id).is_some_and(|handle| handle.id() == task_id) {
            self.handles.remove(&id);
        }
        match joined {
            Ok((_, result)) => match serde_json::to_value(result) {
                Ok(result) => Some(Response::result(id, result)),
                Err(error) => {
                    Some(Response::error(Some(id), ErrorObject::internal_error(error.to_string())))
                }
            },
            Err(error) if error.is_cancelled() => None,
            Err(error) => {
                error!(?id, %error, "tool call crashed");
                Some(Response::error(
                    Some(id),
                    ErrorObject::internal_error(format!("Tool call failed: {error}")),
                ))
            }
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(output: &mut W, message: &impl Serialize) -> Result {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    output.write_all(&line).await.context("failed to write the output")?;
    output.flush().await.context("failed to flush the output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        api::{
            price_source::{PriceSource, StaticPriceSource},
            ree::DayPayload,
        },
        error::AdvisorError,
        quantity::power::Kilowatts,
    };

    const FIXTURE: &str = include_str!("../../fixtures/ree-pvpc-2024-01-15.json");

    /// Never answers.
    struct PendingPriceSource;

    #[async_trait]
    impl PriceSource for PendingPriceSource {
        async fn fetch_day(&self, _on: NaiveDate) -> Result<DayPayload, AdvisorError> {
            pending().await
        }
    }

    struct PanickingPriceSource;

    #[async_trait]
    impl PriceSource for PanickingPriceSource {
        async fn fetch_day(&self, _on: NaiveDate) -> Result<DayPayload, AdvisorError> {
            panic!("the source has crashed");
        }
    }

    async fn exchange(source: impl PriceSource + 'static, input: &str) -> Result<Vec<Value>> {
        let server = Server::new(ChargingAdvisor::new(Arc::new(source), Kilowatts::new(7.4)));
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await?;
        String::from_utf8(output)?
            .lines()
            .map(|line| serde_json::from_str(line).context("invalid output line"))
            .collect()
    }

    #[tokio::test]
    async fn test_handshake_and_listing() -> Result {
        let responses = exchange(
            StaticPriceSource(FIXTURE),
            concat!(
                r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
                "\n\n",
                r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list"}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "id": "three", "method": "ping"}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mcp-charging-advisor");
        assert_eq!(responses[1]["id"], 2);
        let tools = responses[1]["result"]["tools"].as_array().context("no tools")?;
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "get_best_charging_hours");
        assert_eq!(tools[1]["name"], "get_current_pvpc_prices");
        assert_eq!(responses[2], json!({"jsonrpc": "2.0", "id": "three", "result": {}}));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call() -> Result {
        let responses = exchange(
            StaticPriceSource(FIXTURE),
            concat!(
                r#"{"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "get_best_charging_hours", "arguments": {"date": "2024-01-15"}}}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 5);
        assert_eq!(responses[0]["result"]["isError"], false);
        let text = responses[0]["result"]["content"][0]["text"].as_str().context("no text")?;
        let recommendation: Value = serde_json::from_str(text)?;
        assert_eq!(recommendation["recommended_hours"], json!(["04:00"]));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_error_is_text() -> Result {
        let responses = exchange(
            StaticPriceSource(r#"{"included": []}"#),
            concat!(
                r#"{"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": "get_current_pvpc_prices", "arguments": {"date": "2024-01-15"}}}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(
            responses[0]["result"]["content"][0]["text"],
            "Error in charging advisor: No price data available for date 2024-01-15",
        );
        assert_eq!(responses[0]["result"]["isError"], true);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancellation() -> Result {
        let responses = exchange(
            PendingPriceSource,
            concat!(
                r#"{"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "get_current_pvpc_prices"}}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 7, "reason": "user"}}"#,
                "\n",
            ),
        )
        .await?;
        assert!(responses.is_empty(), "{responses:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_crashed_call_is_answered() -> Result {
        let responses = exchange(
            PanickingPriceSource,
            concat!(
                r#"{"jsonrpc": "2.0", "id": 11, "method": "tools/call", "params": {"name": "get_current_pvpc_prices"}}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 11);
        assert_eq!(responses[0]["error"]["code"], -32603);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_request_id() -> Result {
        let responses = exchange(
            PendingPriceSource,
            concat!(
                r#"{"jsonrpc": "2.0", "id": 12, "method": "tools/call", "params": {"name": "get_current_pvpc_prices"}}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "id": 12, "method": "tools/call", "params": {"name": "get_current_pvpc_prices"}}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 12}}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(responses.len(), 1, "{responses:?}");
        assert_eq!(responses[0]["id"], 12);
        assert_eq!(responses[0]["error"]["code"], -32600);
        Ok(())
    }

    #[tokio::test]
    async fn test_protocol_errors() -> Result {
        let responses = exchange(
            StaticPriceSource(FIXTURE),
            concat!(
                "not json\n",
                r#"{"jsonrpc": "2.0", "id": 8}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "id": 9, "method": "resources/list"}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "id": 10, "method": "tools/call", "params": {"arguments": {}}}"#,
                "\n",
                r#"{"jsonrpc": "2.0", "method": "notifications/unknown"}"#,
                "\n",
            ),
        )
        .await?;
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32600);
        assert_eq!(responses[2]["id"], 9);
        assert_eq!(responses[2]["error"]["code"], -32601);
        assert_eq!(responses[3]["id"], 10);
        assert_eq!(responses[3]["error"]["code"], -32602);
        Ok(())
    }
}
