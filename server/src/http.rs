use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::map::LevelService;
use common::{protocol::CGenerateLevel, tilemap::LevelDocument};

// The only field the browser client queries
const GENERATE_LEVEL_FIELD: &str = "generateLevel";

// ============================================================================
// GraphQL Envelope
// ============================================================================

// The selection set is not interpreted: a `generateLevel` query always receives
// the whole level document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Option<CGenerateLevel>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlResponse {
    pub data: Option<GraphqlData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlData {
    pub generate_level: LevelDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphqlError {
    pub message: String,
}

impl GraphqlResponse {
    fn level(level: LevelDocument) -> Self {
        Self {
            data: Some(GraphqlData { generate_level: level }),
            errors: Vec::new(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![GraphqlError {
                message: message.into(),
            }],
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(service: LevelService) -> Router {
    Router::new()
        .route("/graphql", post(graphql))
        .route("/health", get(health))
        .with_state(Arc::new(service))
}

async fn health() -> &'static str {
    "ok"
}

// Errors are reported in the response body with status 200, as GraphQL clients
// expect. That includes bodies that are not JSON or whose variables are missing
// or mistyped, so the body is decoded here rather than by the extractor.
pub async fn graphql(
    State(service): State<Arc<LevelService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Json<GraphqlResponse> {
    let request = match parse_request(body) {
        Ok(request) => request,
        Err(message) => {
            warn!("malformed graphql request: {message}");
            return Json(GraphqlResponse::error(message));
        }
    };

    if !request.query.contains(GENERATE_LEVEL_FIELD) {
        warn!(operation = ?request.operation_name, "unsupported query");
        return Json(GraphqlResponse::error(format!(
            "unsupported query: only {GENERATE_LEVEL_FIELD} is available"
        )));
    }
    let Some(variables) = request.variables else {
        return Json(GraphqlResponse::error("missing variables: height and width are required"));
    };

    debug!(?variables, "graphql level request");
    let result = tokio::task::spawn_blocking(move || service.handle(&variables)).await;
    let response = match result {
        Ok(Ok(level)) => GraphqlResponse::level(level),
        Ok(Err(err)) => {
            warn!("rejected level request: {err}");
            GraphqlResponse::error(err.to_string())
        }
        Err(err) => {
            warn!("level worker failed: {err}");
            GraphqlResponse::error("level generation failed")
        }
    };
    Json(response)
}

fn parse_request(body: Result<Json<Value>, JsonRejection>) -> Result<GraphqlRequest, String> {
    let Json(value) = body.map_err(|rejection| rejection.body_text())?;
    serde_json::from_value(value).map_err(|err| format!("invalid request: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const QUERY: &str = "query GenerateLevel($height: Int!, $width: Int!, $hallWidth: Int) { generateLevel(height: $height, width: $width, hallWidth: $hallWidth) { height width } }";

    fn request(body: Value) -> GraphqlRequest {
        serde_json::from_value(body).unwrap()
    }

    async fn call(body: Value) -> GraphqlResponse {
        let Json(response) = graphql(State(Arc::new(LevelService::default())), Ok(Json(body))).await;
        response
    }

    #[test]
    fn parses_browser_request() {
        let req = request(json!({
            "query": QUERY,
            "variables": { "height": 10, "width": 10, "hallWidth": 2 },
        }));
        let variables = req.variables.unwrap();
        assert_eq!((variables.height, variables.width), (10, 10));
        assert_eq!(variables.hall_width, Some(2));
        assert_eq!(variables.seed, None);
    }

    #[tokio::test]
    async fn returns_generated_level() {
        let response = call(json!({
            "query": QUERY,
            "variables": { "height": 10, "width": 12, "hallWidth": 2, "seed": 4 },
            "operationName": "GenerateLevel",
        }))
        .await;
        assert!(response.errors.is_empty());
        let level = response.data.unwrap().generate_level;
        assert_eq!((level.height, level.width), (10, 12));

        let body = serde_json::to_value(GraphqlResponse::level(level)).unwrap();
        assert_eq!(body["data"]["generateLevel"]["orientation"], json!("isometric"));
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn null_hall_width_uses_default() {
        let response = call(json!({
            "query": QUERY,
            "variables": { "height": 1, "width": 1, "hallWidth": null },
        }))
        .await;
        let level = response.data.unwrap().generate_level;
        assert_eq!(level.nextobjectid, 2);
    }

    #[tokio::test]
    async fn reports_validation_errors() {
        let response = call(json!({
            "query": QUERY,
            "variables": { "height": 0, "width": 10 },
        }))
        .await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.starts_with("invalid dimensions"));
    }

    #[tokio::test]
    async fn rejects_other_queries() {
        let response = call(json!({ "query": "{ players { name } }" })).await;
        assert!(response.data.is_none());
        assert!(response.errors[0].message.contains("unsupported query"));

        let response = call(json!({ "query": QUERY })).await;
        assert!(response.errors[0].message.contains("missing variables"));
    }

    #[tokio::test]
    async fn reports_missing_variables_in_the_envelope() {
        let response = call(json!({
            "query": QUERY,
            "variables": { "width": 10 },
        }))
        .await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("missing field `height`"), "{}", response.errors[0].message);
    }

    #[tokio::test]
    async fn reports_mistyped_variables_in_the_envelope() {
        let response = call(json!({
            "query": QUERY,
            "variables": { "height": "ten", "width": 10 },
        }))
        .await;
        assert!(response.data.is_none());
        assert!(response.errors[0].message.starts_with("invalid request"));
    }
}
