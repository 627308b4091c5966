//! Line-delimited JSON messages exchanged over the control socket.
//!
//! One request per line, one response per line:
//!
//! ```text
//! → {"request":"bay_states"}
//! ← {"ok":true,"data":{"BAY-1":true,"BAY-2":false}}
//! → {"request":"set_bays","bays":[{"ref":"BAY-1","mac":"00:11:22:33:44:55"}]}
//! ← {"ok":false,"error":"invalid address: ..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bays::MappingEntry;
use crate::core::snapshot::SharedState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Bays,
    BayStates,
    Health,
    SetBays { bays: Vec<MappingEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::failure(format!("failed to encode response: {e}")),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Parse one request line and answer it against the shared snapshots.
pub fn handle_line(shared: &SharedState, line: &str) -> Response {
    match serde_json::from_str::<Request>(line.trim()) {
        Ok(request) => handle_request(shared, request),
        Err(e) => Response::failure(format!("invalid request: {e}")),
    }
}

pub fn handle_request(shared: &SharedState, request: Request) -> Response {
    match request {
        Request::Bays => Response::success(shared.get_bays()),
        Request::BayStates => Response::success(&*shared.get_bay_states()),
        Request::Health => Response::success(shared.health()),
        Request::SetBays { bays } => match shared.set_bays(&bays) {
            Ok(saved) => {
                log_pipe!();
                log_info!("Bay mapping replaced over IPC ({} bays)", saved.len());
                Response::success(saved)
            }
            Err(e) => Response::failure(e.to_string()),
        },
    }
}
