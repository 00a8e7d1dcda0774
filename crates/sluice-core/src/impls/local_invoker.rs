use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{FunctionId, InvokeError, InvokeResponse};
use crate::ports::{FunctionInvoker, InvocationMode, InvokeRequest};

/// Function error name reported when a local function returns `Err`.
pub const UNHANDLED: &str = "Unhandled";

/// Status returned for accepted `Event` invocations.
pub const STATUS_ACCEPTED: u16 = 202;

/// An in-process function.
///
/// `Err` means the function itself failed; the invoker reports it as a
/// completed call with a function error, the same way a remote service would.
#[async_trait]
pub trait LocalFunction: Send + Sync {
    async fn call(&self, payload: &[u8]) -> Result<Vec<u8>, String>;
}

/// Adapter so closures can be registered without a named type.
pub struct FnFunction<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> LocalFunction for FnFunction<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>, String>> + Send + 'static,
{
    async fn call(&self, payload: &[u8]) -> Result<Vec<u8>, String> {
        (self.f)(payload.to_vec()).await
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("function '{0}' is already registered")]
    AlreadyRegistered(FunctionId),
}

/// Registry of local functions (function id -> function).
///
/// Design:
/// - Built during initialization (mutable).
/// - Used during dispatch (immutable).
///
/// This avoids locks, the same as any other read-only routing table.
#[derive(Default)]
pub struct LocalInvoker {
    functions: HashMap<FunctionId, Arc<dyn LocalFunction>>,
}

impl LocalInvoker {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        function: FunctionId,
        handler: Arc<dyn LocalFunction>,
    ) -> Result<(), RegistryError> {
        if self.functions.contains_key(&function) {
            return Err(RegistryError::AlreadyRegistered(function));
        }
        self.functions.insert(function, handler);
        Ok(())
    }

    pub fn register_fn<F, Fut>(&mut self, function: FunctionId, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, String>> + Send + 'static,
    {
        self.register(function, Arc::new(FnFunction { f }))
    }

    pub fn registered(&self) -> Vec<FunctionId> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[async_trait]
impl FunctionInvoker for LocalInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        let handler = self
            .functions
            .get(&request.function)
            .cloned()
            .ok_or_else(|| InvokeError::FunctionNotFound(request.function.clone()))?;

        match request.mode {
            InvocationMode::RequestResponse => Ok(match handler.call(&request.payload).await {
                Ok(payload) => InvokeResponse::ok(payload),
                Err(message) => InvokeResponse::function_error(UNHANDLED, error_payload(&message)),
            }),
            InvocationMode::Event => {
                // fire-and-forget: the result is dropped
                tokio::spawn(async move {
                    let _ = handler.call(&request.payload).await;
                });
                Ok(InvokeResponse::with_status(STATUS_ACCEPTED))
            }
        }
    }
}

fn error_payload(message: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "errorMessage": message,
        "errorType": UNHANDLED,
    }))
    .unwrap_or_default()
}

/// Built-in function that echoes JSON payloads back and fails on anything
/// that is not valid JSON.
pub struct JsonEcho;

#[async_trait]
impl LocalFunction for JsonEcho {
    async fn call(&self, payload: &[u8]) -> Result<Vec<u8>, String> {
        let value: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| format!("json decode: {e}"))?;
        serde_json::to_vec(&value).map_err(|e| e.to_string())
    }
}
