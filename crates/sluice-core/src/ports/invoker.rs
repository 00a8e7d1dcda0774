//! FunctionInvoker port - 呼び出し可能な関数サービスの抽象化

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{FunctionId, InvokeError, InvokeResponse};

/// How the function service should run the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvocationMode {
    /// Wait for the function to finish and return its result.
    RequestResponse,
    /// Queue the call and return immediately.
    Event,
}

impl InvocationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestResponse => "RequestResponse",
            Self::Event => "Event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub function: FunctionId,
    pub payload: Vec<u8>,
    pub mode: InvocationMode,
}

impl InvokeRequest {
    /// Synchronous call; the only mode the dispatcher uses.
    pub fn request_response(function: FunctionId, payload: Vec<u8>) -> Self {
        Self {
            function,
            payload,
            mode: InvocationMode::RequestResponse,
        }
    }
}

/// FunctionInvoker は関数を呼び出して結果を返す
///
/// `Err` は「呼び出し自体が完了しなかった」ことを表す。関数側の失敗
/// （non-OK status, function error）は `Ok(InvokeResponse)` の中身で表す。
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError>;
}
