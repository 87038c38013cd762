use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub image: String,
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointRequest {
    pub image: String,
    pub object: String,
}

/// The point endpoint answers `{"point": [x, y]}` with normalized
/// coordinates; the field is absent when nothing matched.
#[derive(Debug, Clone, Deserialize)]
pub struct PointResponse {
    #[serde(default)]
    pub point: Option<Vec<f64>>,
}

/// A navigation action suggested by the vision model when the target
/// element is not on the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationHint {
    /// One of the step vocabulary actions, e.g. "scroll down" or
    /// "click settings icon". Fed back through the step executor verbatim.
    Action(String),
    /// The model judged the goal unreachable from the current screen.
    NotPossible,
}
