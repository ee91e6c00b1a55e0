//! Static tool catalog and validated invocations
//!
//! The catalog is fixed at compile time: seven [`Operation`]s, each with a
//! name, a description for client-side discovery and a JSON schema for its
//! arguments. An [`Invocation`] can only be built through validation, so a
//! malformed request fails with `InvalidArgument` before it reaches the
//! engine or the capture queue.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{CaptureError, CaptureResult},
    model::{CapturedImage, CloseAck, Monitor, MonitorSelector, Window},
};

/// Every invocable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListMonitors,
    CountMonitors,
    CaptureMonitor,
    ListWindows,
    CountWindows,
    CaptureWindow,
    CloseWindow,
}

impl Operation {
    /// Catalog order, which is also the order tools are advertised in.
    pub const ALL: [Operation; 7] = [
        Operation::ListMonitors,
        Operation::CountMonitors,
        Operation::CaptureMonitor,
        Operation::ListWindows,
        Operation::CountWindows,
        Operation::CaptureWindow,
        Operation::CloseWindow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListMonitors => "list_monitors",
            Operation::CountMonitors => "count_monitors",
            Operation::CaptureMonitor => "capture_monitor",
            Operation::ListWindows => "list_windows",
            Operation::CountWindows => "count_windows",
            Operation::CaptureWindow => "capture_window",
            Operation::CloseWindow => "close_window",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::ListMonitors => {
                "List all monitors with index, name, position, size and primary flag. Indices \
                 are 0-based and only valid until the display topology changes."
            }
            Operation::CountMonitors => "Return the number of monitors.",
            Operation::CaptureMonitor => {
                "Capture a full monitor as a PNG image. monitor_index selects a monitor from \
                 list_monitors; omit it (or pass \"primary\") for the primary monitor."
            }
            Operation::ListWindows => {
                "List open windows with id, title, application name, geometry and \
                 minimized/maximized state. Use the id with capture_window or close_window."
            }
            Operation::CountWindows => "Return the number of open windows.",
            Operation::CaptureWindow => {
                "Capture one window by id as a PNG image. Minimized or zero-size windows cannot \
                 be captured."
            }
            Operation::CloseWindow => {
                "Ask the OS to close a window by id. This is a graceful close request; the \
                 application may prompt or refuse."
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Read-only enumeration that a thread-safe backend may run off-queue.
    pub fn is_enumeration(&self) -> bool {
        matches!(
            self,
            Operation::ListMonitors
                | Operation::CountMonitors
                | Operation::ListWindows
                | Operation::CountWindows
        )
    }

    /// JSON schema of the operation's `arguments` object.
    pub fn argument_schema(&self) -> Value {
        let schema = match self {
            Operation::CaptureMonitor => schemars::schema_for!(CaptureMonitorArgs),
            Operation::CaptureWindow | Operation::CloseWindow => {
                schemars::schema_for!(WindowIdArgs)
            }
            _ => schemars::schema_for!(EmptyArgs),
        };
        schema.to_value()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments for operations that take none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EmptyArgs {}

/// Arguments for `capture_monitor`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CaptureMonitorArgs {
    /// 0-based monitor index from list_monitors, or "primary". Defaults to the primary monitor.
    #[serde(default)]
    pub monitor_index: Option<MonitorSelectorArg>,
}

/// Wire form of a monitor selector: an index or a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MonitorSelectorArg {
    Index(u32),
    Keyword(String),
}

impl MonitorSelectorArg {
    /// Resolves the wire value; `"primary"` is case-insensitive and numeric
    /// strings are accepted as indices.
    pub fn resolve(&self) -> CaptureResult<MonitorSelector> {
        match self {
            MonitorSelectorArg::Index(index) => Ok(MonitorSelector::Index(*index as usize)),
            MonitorSelectorArg::Keyword(word) => {
                let word = word.trim();
                if word.eq_ignore_ascii_case("primary") {
                    Ok(MonitorSelector::Primary)
                } else if let Ok(index) = word.parse::<usize>() {
                    Ok(MonitorSelector::Index(index))
                } else {
                    Err(CaptureError::InvalidParameter {
                        parameter: "monitor_index".to_string(),
                        reason:    format!(
                            "expected a non-negative integer or \"primary\", got \"{word}\""
                        ),
                    })
                }
            }
        }
    }
}

/// Arguments for `capture_window` and `close_window`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WindowIdArgs {
    /// Window id from list_windows
    pub window_id: u32,
}

/// A validated request for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    ListMonitors,
    CountMonitors,
    CaptureMonitor { selector: MonitorSelector },
    ListWindows,
    CountWindows,
    CaptureWindow { window_id: u32 },
    CloseWindow { window_id: u32 },
}

impl Invocation {
    /// Validates a raw request.
    ///
    /// `arguments` may be absent for operations without required fields.
    ///
    /// ```
    /// use serde_json::json;
    /// use windowcap_core::{model::MonitorSelector, registry::Invocation};
    ///
    /// let args = json!({ "monitor_index": 1 });
    /// let inv = Invocation::parse("capture_monitor", args.as_object()).unwrap();
    /// assert_eq!(inv, Invocation::CaptureMonitor { selector: MonitorSelector::Index(1) });
    ///
    /// assert!(Invocation::parse("rm_rf", None).is_err());
    /// ```
    pub fn parse(name: &str, arguments: Option<&Map<String, Value>>) -> CaptureResult<Self> {
        let operation = Operation::from_name(name).ok_or_else(|| CaptureError::UnknownOperation {
            name: name.to_string(),
        })?;
        let arguments = Value::Object(arguments.cloned().unwrap_or_default());

        match operation {
            Operation::ListMonitors => without_arguments(arguments, Self::ListMonitors),
            Operation::CountMonitors => without_arguments(arguments, Self::CountMonitors),
            Operation::ListWindows => without_arguments(arguments, Self::ListWindows),
            Operation::CountWindows => without_arguments(arguments, Self::CountWindows),
            Operation::CaptureMonitor => {
                let args: CaptureMonitorArgs = decode_arguments(arguments)?;
                Self::capture_monitor(args.monitor_index.as_ref())
            }
            Operation::CaptureWindow => {
                let args: WindowIdArgs = decode_arguments(arguments)?;
                Ok(Self::capture_window(args.window_id))
            }
            Operation::CloseWindow => {
                let args: WindowIdArgs = decode_arguments(arguments)?;
                Ok(Self::close_window(args.window_id))
            }
        }
    }

    /// `capture_monitor` from an already-decoded selector; `None` is primary.
    pub fn capture_monitor(selector: Option<&MonitorSelectorArg>) -> CaptureResult<Self> {
        let selector = match selector {
            Some(arg) => arg.resolve()?,
            None => MonitorSelector::Primary,
        };
        Ok(Self::CaptureMonitor { selector })
    }

    pub fn capture_window(window_id: u32) -> Self {
        Self::CaptureWindow { window_id }
    }

    pub fn close_window(window_id: u32) -> Self {
        Self::CloseWindow { window_id }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::ListMonitors => Operation::ListMonitors,
            Self::CountMonitors => Operation::CountMonitors,
            Self::CaptureMonitor { .. } => Operation::CaptureMonitor,
            Self::ListWindows => Operation::ListWindows,
            Self::CountWindows => Operation::CountWindows,
            Self::CaptureWindow { .. } => Operation::CaptureWindow,
            Self::CloseWindow { .. } => Operation::CloseWindow,
        }
    }
}

fn without_arguments(arguments: Value, invocation: Invocation) -> CaptureResult<Invocation> {
    let EmptyArgs {} = decode_arguments(arguments)?;
    Ok(invocation)
}

fn decode_arguments<T: serde::de::DeserializeOwned>(arguments: Value) -> CaptureResult<T> {
    serde_json::from_value(arguments).map_err(|e| CaptureError::InvalidParameter {
        parameter: "arguments".to_string(),
        reason:    e.to_string(),
    })
}

/// Success payload of an invocation.
#[derive(Debug, Clone)]
pub enum ToolPayload {
    Monitors(Vec<Monitor>),
    Windows(Vec<Window>),
    Count(usize),
    Image(CapturedImage),
    Closed(CloseAck),
}

/// Exactly one of a payload or an error.
pub type ToolOutcome = CaptureResult<ToolPayload>;

/// Discovery record for one catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name:         &'static str,
    pub description:  &'static str,
    pub input_schema: Value,
}

/// The full catalog in advertised order.
pub fn catalog() -> Vec<ToolDescriptor> {
    Operation::ALL
        .iter()
        .map(|op| ToolDescriptor {
            name:         op.name(),
            description:  op.description(),
            input_schema: op.argument_schema(),
        })
        .collect()
}
