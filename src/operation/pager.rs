//! Paginated Operation Invoker
//!
//! Calls a list operation repeatedly, stitching pages into one ordered item
//! sequence. Pages are fetched one at a time; nothing is fetched ahead.
//!
//! Two states: `Fetching` until the server returns an empty cursor, the item
//! cap is reached, a single-shot call completes, a call fails, or the
//! cancellation token fires; `Done` afterwards.

use super::registry::{OperationDef, PaginationDef};
use super::request::OperationRequest;
use super::select::lookup_path;
use crate::remote::{CmdletError, RemoteClient};
use futures::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Caller-facing paging controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingOptions {
    /// Explicit starting cursor; `Some("")` means "from the beginning, but I'm paging"
    pub next_token: Option<String>,
    /// Client-side cap on items emitted across pages
    pub max_items: Option<usize>,
    /// Server-side page size hint, forwarded into the operation's limit field
    pub page_size: Option<u32>,
    pub auto_iterate: bool,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            next_token: None,
            max_items: None,
            page_size: None,
            auto_iterate: true,
        }
    }
}

impl PagingOptions {
    pub fn with_next_token(mut self, token: &str) -> Self {
        self.next_token = Some(token.to_string());
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn single_page(mut self) -> Self {
        self.auto_iterate = false;
        self
    }

    /// True when exactly one call must be made
    pub fn caller_controls_paging(&self) -> bool {
        !self.auto_iterate || self.next_token.is_some()
    }

    /// Flag that only means something for a paginated operation, if any was set
    ///
    /// `page_size` is left out: it is also a persisted default.
    pub fn paging_flag(&self) -> Option<&'static str> {
        if self.next_token.is_some() {
            Some("next-token")
        } else if self.max_items.is_some() {
            Some("max-items")
        } else if !self.auto_iterate {
            Some("no-auto-iterate")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Fetching,
    Done,
}

/// Summary of a finished invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
    /// Cursor to resume from; `None` when the server had nothing more
    pub next_token: Option<String>,
    pub calls: usize,
    pub items_emitted: usize,
    pub cancelled: bool,
    pub last_response: Option<Value>,
}

/// Pull-based pager over one list operation
pub struct Pager<'a, C> {
    client: &'a C,
    operation: &'a OperationDef,
    pagination: &'a PaginationDef,
    request: OperationRequest,
    cursor: Option<String>,
    max_items: Option<usize>,
    caller_controls_paging: bool,
    items_emitted: usize,
    calls: usize,
    state: PagerState,
    cancelled: bool,
    cancel: CancellationToken,
    buffered: VecDeque<Value>,
    last_response: Option<Value>,
}

impl<'a, C: RemoteClient> Pager<'a, C> {
    pub fn new(
        client: &'a C,
        operation: &'a OperationDef,
        mut request: OperationRequest,
        options: &PagingOptions,
        cancel: CancellationToken,
    ) -> Result<Self, CmdletError> {
        let Some(pagination) = operation.pagination.as_ref() else {
            return Err(CmdletError::invalid(&operation.name, "operation does not paginate"));
        };

        if let (Some(size), Some(limit_key)) = (options.page_size, &pagination.limit_key) {
            request.insert(limit_key, size);
        }

        // A cursor bound as a plain parameter resumes exactly like --next-token
        let bound_cursor = bound_cursor(&request, &pagination.input_token)?;
        let caller_controls_paging = options.caller_controls_paging() || bound_cursor.is_some();
        let cursor = options.next_token.clone().or(bound_cursor);

        Ok(Self {
            client,
            operation,
            pagination,
            request,
            cursor,
            max_items: options.max_items,
            caller_controls_paging,
            items_emitted: 0,
            calls: 0,
            state: PagerState::Fetching,
            cancelled: false,
            cancel,
            buffered: VecDeque::new(),
            last_response: None,
        })
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn items_emitted(&self) -> usize {
        self.items_emitted
    }

    /// Cursor to resume from once the pager is done
    pub fn next_token(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Fetch the next page; `None` once the pager is done
    pub async fn next_page(&mut self) -> Option<Result<Vec<Value>, CmdletError>> {
        if self.state == PagerState::Done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.finish_cancelled();
            return None;
        }

        self.request
            .set_cursor(&self.pagination.input_token, self.cursor.as_deref());

        tracing::debug!(
            "{} page {} (cursor: {})",
            self.operation.name,
            self.calls + 1,
            self.cursor.as_deref().unwrap_or("<start>")
        );

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.client.invoke(self.operation, &self.request) => Some(result),
        };
        let Some(result) = result else {
            self.finish_cancelled();
            return None;
        };

        self.calls += 1;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.state = PagerState::Done;
                tracing::warn!(
                    "{} failed on page {} after {} items: {}",
                    self.operation.name,
                    self.calls,
                    self.items_emitted,
                    e
                );
                return Some(Err(e));
            }
        };

        let items = extract_items(&response, &self.pagination.items_path);
        self.items_emitted += items.len();
        self.cursor = extract_cursor(&response, &self.pagination.output_token);
        self.last_response = Some(response);

        if self.caller_controls_paging {
            self.state = PagerState::Done;
        } else if self.max_items.is_some_and(|cap| self.items_emitted >= cap) {
            tracing::debug!("{} reached item cap at {}", self.operation.name, self.items_emitted);
            self.state = PagerState::Done;
        } else if self.cursor.is_none() {
            self.state = PagerState::Done;
        }

        Some(Ok(items))
    }

    /// Next single item across page boundaries
    pub async fn next_item(&mut self) -> Option<Result<Value, CmdletError>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            match self.next_page().await? {
                Ok(items) => self.buffered.extend(items),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Consume the pager as a lazy item stream
    ///
    /// The final cursor is not observable through the stream; use
    /// [`Pager::next_page`] when manual resumption matters.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, CmdletError>> + 'a
    where
        C: 'a,
    {
        futures::stream::unfold(self, |mut pager| async move {
            pager.next_item().await.map(|item| (item, pager))
        })
    }

    pub fn into_outcome(self) -> PageOutcome {
        PageOutcome {
            next_token: self.cursor,
            calls: self.calls,
            items_emitted: self.items_emitted,
            cancelled: self.cancelled,
            last_response: self.last_response,
        }
    }

    fn finish_cancelled(&mut self) {
        tracing::warn!(
            "{} cancelled after {} calls, {} items",
            self.operation.name,
            self.calls,
            self.items_emitted
        );
        self.cancelled = true;
        self.state = PagerState::Done;
    }
}

/// Run a list operation to completion, pushing every item into `emit`
///
/// Items from pages before a failing call have already been emitted when
/// the error is returned.
pub async fn invoke_paginated<C, F>(
    client: &C,
    operation: &OperationDef,
    request: OperationRequest,
    options: &PagingOptions,
    cancel: &CancellationToken,
    mut emit: F,
) -> Result<PageOutcome, CmdletError>
where
    C: RemoteClient,
    F: FnMut(Value),
{
    let mut pager = Pager::new(client, operation, request, options, cancel.clone())?;

    while let Some(page) = pager.next_page().await {
        for item in page? {
            emit(item);
        }
    }

    Ok(pager.into_outcome())
}

/// Cursor the caller put directly into the request's input-token field
fn bound_cursor(request: &OperationRequest, field: &str) -> Result<Option<String>, CmdletError> {
    match request.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) => Ok(Some(token.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(CmdletError::invalid(field, "continuation cursor must be a string")),
    }
}

/// Items of one page, in server order
fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    lookup_path(response, path)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Continuation cursor of one page; empty and absent both mean "no more"
fn extract_cursor(response: &Value, path: &str) -> Option<String> {
    lookup_path(response, path)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
