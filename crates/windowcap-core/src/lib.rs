//! windowcap-core: Cross-platform monitor and window capture engine
//!
//! This library enumerates displays ("monitors") and OS windows, captures
//! their pixels as PNG, and closes windows on request. It is organised in
//! layers, leaves first:
//!
//! - [`capture`]: platform backends behind composable capability traits
//!   (xcap reference backend, mock backend)
//! - [`engine`]: platform-independent orchestration (index assignment,
//!   coordinate normalization, PNG encoding, error normalization)
//! - [`registry`]: the static tool catalog and validated invocations
//! - [`dispatch`]: the single capture context that serializes every platform
//!   capture call and correlates results back to callers

pub mod capture;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod util;

pub use dispatch::{CorrelationId, Dispatcher, PendingReply};
pub use engine::{CaptureEngine, EngineConfig};
pub use error::{CaptureError, CaptureResult, ErrorKind};
pub use registry::{Invocation, Operation, ToolOutcome, ToolPayload};
