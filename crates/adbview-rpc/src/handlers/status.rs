//! Controller status handler.

use crate::server::AppState;
use serde_json::Value;

pub async fn get_status(state: &AppState, _params: &Value) -> adbview_core::Result<Value> {
    let status = state.bridge.controller().status();
    Ok(serde_json::to_value(status)?)
}
