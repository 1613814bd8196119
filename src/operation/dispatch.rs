//! Operation dispatch
//!
//! The per-invocation template: look the operation up, validate the request,
//! make one call or paginate, project the result, and push output values to
//! the caller's sink.

use super::pager::{invoke_paginated, PagingOptions};
use super::registry::{get_operation, OperationDef};
use super::request::OperationRequest;
use super::select::Select;
use crate::remote::{CmdletError, RemoteClient};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// What an invocation did, beyond the values it emitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// Cursor for manual resumption; `None` when nothing is left
    pub next_token: Option<String>,
    pub calls: usize,
    pub items_emitted: usize,
    pub cancelled: bool,
}

/// Invoke a registered operation by name or cmdlet alias
pub async fn invoke_operation<C, F>(
    client: &C,
    operation_name: &str,
    request: OperationRequest,
    options: &PagingOptions,
    select: Option<&Select>,
    cancel: &CancellationToken,
    emit: F,
) -> Result<InvocationOutcome, CmdletError>
where
    C: RemoteClient,
    F: FnMut(Value),
{
    let Some(operation) = get_operation(operation_name) else {
        return Err(CmdletError::UnknownOperation(operation_name.to_string()));
    };
    invoke_with(client, operation, request, options, select, cancel, emit).await
}

/// Invoke an operation definition
pub async fn invoke_with<C, F>(
    client: &C,
    operation: &OperationDef,
    request: OperationRequest,
    options: &PagingOptions,
    select: Option<&Select>,
    cancel: &CancellationToken,
    mut emit: F,
) -> Result<InvocationOutcome, CmdletError>
where
    C: RemoteClient,
    F: FnMut(Value),
{
    request.validate(operation)?;
    if operation.pagination.is_none() {
        if let Some(flag) = options.paging_flag() {
            return Err(CmdletError::invalid(
                flag,
                format!("{} does not paginate", operation.name),
            ));
        }
    }

    let select = select
        .cloned()
        .unwrap_or_else(|| Select::default_for(operation));
    let span = tracing::info_span!(
        "invoke",
        operation = %operation.name,
        id = %Uuid::new_v4()
    );

    async move {
        let outcome = match &operation.pagination {
            Some(pagination) => {
                let streams_items =
                    matches!(&select, Select::Field(path) if *path == pagination.items_path);

                if streams_items {
                    let outcome =
                        invoke_paginated(client, operation, request, options, cancel, &mut emit)
                            .await?;
                    InvocationOutcome {
                        next_token: outcome.next_token,
                        calls: outcome.calls,
                        items_emitted: outcome.items_emitted,
                        cancelled: outcome.cancelled,
                    }
                } else {
                    let echo = request.clone();
                    let outcome =
                        invoke_paginated(client, operation, request, options, cancel, |_| {})
                            .await?;
                    let emitted = match &outcome.last_response {
                        Some(response) => emit_projected(select.apply(response, &echo), &mut emit),
                        None => 0,
                    };
                    InvocationOutcome {
                        next_token: outcome.next_token,
                        calls: outcome.calls,
                        items_emitted: emitted,
                        cancelled: outcome.cancelled,
                    }
                }
            }
            None => invoke_single(client, operation, &request, &select, cancel, &mut emit).await?,
        };

        tracing::info!(
            "{} done: {} calls, {} items{}",
            operation.name,
            outcome.calls,
            outcome.items_emitted,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        Ok(outcome)
    }
    .instrument(span)
    .await
}

/// Degenerate case: one call, no cursor
async fn invoke_single<C, F>(
    client: &C,
    operation: &OperationDef,
    request: &OperationRequest,
    select: &Select,
    cancel: &CancellationToken,
    emit: &mut F,
) -> Result<InvocationOutcome, CmdletError>
where
    C: RemoteClient,
    F: FnMut(Value),
{
    if cancel.is_cancelled() {
        return Ok(InvocationOutcome {
            cancelled: true,
            ..Default::default()
        });
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = client.invoke(operation, request) => Some(result),
    };
    let Some(response) = response else {
        tracing::warn!("{} cancelled while in flight", operation.name);
        return Ok(InvocationOutcome {
            cancelled: true,
            ..Default::default()
        });
    };
    let response = response?;

    let items_emitted = emit_projected(select.apply(&response, request), emit);
    Ok(InvocationOutcome {
        next_token: None,
        calls: 1,
        items_emitted,
        cancelled: false,
    })
}

/// Lists are enumerated into the output; nulls produce nothing
fn emit_projected<F: FnMut(Value)>(value: Value, emit: &mut F) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => {
            let count = items.len();
            items.into_iter().for_each(|item| emit(item));
            count
        }
        other => {
            emit(other);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a fixed script and records each request body
    struct ScriptedClient {
        replies: Mutex<Vec<Value>>,
        bodies: Mutex<Vec<Value>>,
    }

    impl ScriptedClient {
        fn new(mut replies: Vec<Value>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().unwrap().clone()
        }
    }

    impl RemoteClient for ScriptedClient {
        async fn invoke(
            &self,
            _operation: &OperationDef,
            request: &OperationRequest,
        ) -> Result<Value, CmdletError> {
            self.bodies.lock().unwrap().push(request.to_body());
            Ok(self.replies.lock().unwrap().pop().unwrap_or(json!({})))
        }
    }

    /// Never answers
    struct HangingClient;

    impl RemoteClient for HangingClient {
        async fn invoke(
            &self,
            _operation: &OperationDef,
            _request: &OperationRequest,
        ) -> Result<Value, CmdletError> {
            std::future::pending().await
        }
    }

    async fn collect(
        client: &ScriptedClient,
        operation: &str,
        request: OperationRequest,
        options: &PagingOptions,
        select: Option<&Select>,
    ) -> (Vec<Value>, Result<InvocationOutcome, CmdletError>) {
        let mut out = Vec::new();
        let result = invoke_operation(
            client,
            operation,
            request,
            options,
            select,
            &CancellationToken::new(),
            |v| out.push(v),
        )
        .await;
        (out, result)
    }

    #[tokio::test]
    async fn test_unknown_operation_makes_no_call() {
        let client = ScriptedClient::new(vec![]);
        let (_, result) = collect(
            &client,
            "DescribeNothing",
            OperationRequest::new(),
            &PagingOptions::default(),
            None,
        )
        .await;

        assert!(matches!(result, Err(CmdletError::UnknownOperation(_))));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_param_makes_no_call() {
        let client = ScriptedClient::new(vec![json!({})]);
        let (out, result) = collect(
            &client,
            "DescribeTable",
            OperationRequest::new(),
            &PagingOptions::default(),
            None,
        )
        .await;

        assert!(result.unwrap_err().is_validation());
        assert!(out.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_paginated_default_streams_items() {
        let client = ScriptedClient::new(vec![
            json!({"TableNames": ["a", "b"], "LastEvaluatedTableName": "b"}),
            json!({"TableNames": ["c"]}),
        ]);
        let (out, result) = collect(
            &client,
            "Get-DDBTableList",
            OperationRequest::new(),
            &PagingOptions::default(),
            None,
        )
        .await;

        let outcome = result.unwrap();
        assert_eq!(out, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(outcome.calls, 2);
        assert_eq!(outcome.items_emitted, 3);
    }

    #[tokio::test]
    async fn test_whole_response_select_projects_final_page() {
        let client = ScriptedClient::new(vec![
            json!({"TableNames": ["a"], "LastEvaluatedTableName": "a"}),
            json!({"TableNames": ["b"]}),
        ]);
        let select = Select::Response;
        let (out, result) = collect(
            &client,
            "ListTables",
            OperationRequest::new(),
            &PagingOptions::default(),
            Some(&select),
        )
        .await;

        let outcome = result.unwrap();
        assert_eq!(outcome.calls, 2);
        assert_eq!(outcome.items_emitted, 1);
        assert_eq!(out, vec![json!({"TableNames": ["b"]})]);
    }

    #[tokio::test]
    async fn test_param_select_echoes_input() {
        let client = ScriptedClient::new(vec![json!({"Table": {"TableName": "orders"}})]);
        let select: Select = "^TableName".parse().unwrap();
        let request = OperationRequest::builder().param("TableName", "orders").build();
        let (out, result) = collect(
            &client,
            "DescribeTable",
            request,
            &PagingOptions::default(),
            Some(&select),
        )
        .await;

        assert_eq!(result.unwrap().calls, 1);
        assert_eq!(out, vec![json!("orders")]);
    }

    #[tokio::test]
    async fn test_single_call_default_projection() {
        let client = ScriptedClient::new(vec![json!({
            "Table": {"TableName": "orders", "ItemCount": 3}
        })]);
        let request = OperationRequest::builder().param("TableName", "orders").build();
        let (out, result) = collect(
            &client,
            "DescribeTable",
            request,
            &PagingOptions::default(),
            None,
        )
        .await;

        let outcome = result.unwrap();
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.next_token, None);
        assert_eq!(out, vec![json!({"TableName": "orders", "ItemCount": 3})]);
    }

    #[tokio::test]
    async fn test_cancelled_single_call_is_not_an_error() {
        let client = ScriptedClient::new(vec![json!({})]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = OperationRequest::builder().param("logGroupName", "/app").build();

        let outcome = invoke_operation(
            &client,
            "CreateLogGroup",
            request,
            &PagingOptions::default(),
            None,
            &cancel,
            |_| {},
        )
        .await
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_cursor_param_resumes_from_it() {
        let client = ScriptedClient::new(vec![
            json!({"DirectoryDescriptions": ["B"], "NextToken": "c2"}),
            json!({"DirectoryDescriptions": ["C"]}),
        ]);
        let request = OperationRequest::builder()
            .assign("NextToken=resume-here")
            .unwrap()
            .build();
        let (out, result) = collect(
            &client,
            "DescribeDirectories",
            request,
            &PagingOptions::default(),
            None,
        )
        .await;

        let outcome = result.unwrap();
        assert_eq!(client.bodies(), vec![json!({"NextToken": "resume-here"})]);
        assert_eq!(out, vec![json!("B")]);
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.next_token.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_field_select_counts_projected_values() {
        let client = ScriptedClient::new(vec![json!({
            "DirectoryDescriptions": ["a", "b", "c"],
            "Summary": {"Count": 3}
        })]);
        let select: Select = "Summary".parse().unwrap();
        let (out, result) = collect(
            &client,
            "DescribeDirectories",
            OperationRequest::new(),
            &PagingOptions::default(),
            Some(&select),
        )
        .await;

        assert_eq!(out, vec![json!({"Count": 3})]);
        assert_eq!(result.unwrap().items_emitted, 1);
    }

    #[tokio::test]
    async fn test_paging_flags_rejected_for_single_call_operation() {
        let cases = [
            PagingOptions::default().with_next_token("c1"),
            PagingOptions::default().with_max_items(5),
            PagingOptions::default().single_page(),
        ];
        for options in cases {
            let client = ScriptedClient::new(vec![json!({})]);
            let (_, result) = collect(
                &client,
                "GetDirectoryLimits",
                OperationRequest::new(),
                &options,
                None,
            )
            .await;

            assert!(result.unwrap_err().is_validation());
            assert_eq!(client.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_page_size_ignored_for_single_call_operation() {
        let client = ScriptedClient::new(vec![json!({"DirectoryLimits": {}})]);
        let (_, result) = collect(
            &client,
            "GetDirectoryLimits",
            OperationRequest::new(),
            &PagingOptions::default().with_page_size(10),
            None,
        )
        .await;

        assert_eq!(result.unwrap().calls, 1);
        assert_eq!(client.bodies(), vec![json!({})]);
    }

    async fn cancel_while_hanging(operation: &str, request: OperationRequest) -> InvocationOutcome {
        let cancel = CancellationToken::new();
        let trip = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trip.cancel();
        });

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            invoke_operation(
                &HangingClient,
                operation,
                request,
                &PagingOptions::default(),
                None,
                &cancel,
                |_| panic!("nothing should be emitted"),
            ),
        )
        .await
        .expect("cancellation should end the hung call")
        .unwrap()
    }

    #[tokio::test]
    async fn test_cancel_interrupts_paginated_call_in_flight() {
        let outcome = cancel_while_hanging("DescribeLogGroups", OperationRequest::new()).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.calls, 0);
        assert_eq!(outcome.items_emitted, 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_single_call_in_flight() {
        let request = OperationRequest::builder().param("logGroupName", "/app").build();
        let outcome = cancel_while_hanging("CreateLogGroup", request).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.calls, 0);
    }

    #[test]
    fn test_emit_projected_enumerates_lists() {
        let mut out = Vec::new();
        assert_eq!(emit_projected(json!([1, 2]), &mut |v| out.push(v)), 2);
        assert_eq!(emit_projected(Value::Null, &mut |v| out.push(v)), 0);
        assert_eq!(emit_projected(json!({"k": 1}), &mut |v| out.push(v)), 1);
        assert_eq!(out, vec![json!(1), json!(2), json!({"k": 1})]);
    }
}
