//! Request and response bodies specific to the REST progress endpoints.

use learn_core::model::{ItemId, ProgressSnapshot, UnitId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MarkCompleteRequest<'a> {
    pub unit_id: &'a UnitId,
    pub item_id: &'a ItemId,
}

/// The backend wraps the updated record; a missing or null `progress` is not a confirmation.
#[derive(Debug, Deserialize)]
pub(super) struct MarkCompleteResponse {
    #[serde(default)]
    pub progress: Option<ProgressSnapshot>,
}
