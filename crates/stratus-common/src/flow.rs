use serde::{Deserialize, Serialize};

/// Identity of the flow a resolution call is made for.
///
/// The flow name feeds the deterministic rollout bucket; the execution id is
/// carried for log correlation only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FlowContext {
    pub flow_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<u64>,
}
