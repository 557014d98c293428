//! `POST /predict`: translate one input and return the scored steps.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};
use danbot_core::DanbotError;
use serde::Deserialize;
use tracing::{Instrument, Span, debug, error, info_span, warn};

use crate::routes::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

/// Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub input_text: String,
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("predict", %request_id);

    async move {
        let Json(req) = payload.map_err(|e| {
            warn!(error = %e.body_text(), "Rejected request");
            ApiError::from(e)
        })?;
        debug!(chars = req.input_text.chars().count(), "Request accepted");

        let predictor = state.predictor();
        let task_span = Span::current();
        // The payload borrows the predictor's vocabulary, so serialize on
        // the blocking thread too.
        let body = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, DanbotError> {
            let _enter = task_span.enter();
            let prediction = predictor.predict(&req.input_text)?;
            debug!(
                steps = prediction.logits.len(),
                finish_reason = ?prediction.finish_reason,
                "Prediction done"
            );
            Ok(serde_json::to_vec(&predictor.payload(prediction))?)
        })
        .await
        .map_err(|e| ApiError::Server(format!("Prediction task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "Prediction failed");
            ApiError::from(e)
        })?;

        Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use danbot_core::Mode;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::routes::app;
    use crate::testing::test_state;

    fn post(body: &str) -> Request<Body> {
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, body: &str) -> (StatusCode, Value) {
        let resp = app.oneshot(post(body)).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn generative_payload_shape() {
        let (state, _) = test_state(Mode::Generative, false);
        let (status, json) = send(app(state), r#"{"input_text": "a black cat"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["vocab"]["</translation>"], 1);
        assert_eq!(obj["vocab"].as_object().unwrap().len(), 5);

        // black, cat, </translation>
        let logits = obj["logits"].as_array().unwrap();
        assert_eq!(logits.len(), 3);
        for row in logits {
            let row = row.as_array().unwrap();
            assert_eq!(row.len(), 5);
            let sum: f64 = row.iter().map(|v| v.as_f64().unwrap()).sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn single_pass_returns_raw_scores() {
        let (state, calls) = test_state(Mode::SinglePass, false);
        let (status, json) = send(app(state), r#"{"input_text": "cat"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["logits"], serde_json::json!([[-1.0, -1.0, -1.0, 4.0, -1.0]]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_input_still_decodes() {
        let (state, _) = test_state(Mode::Generative, false);
        let (status, json) = send(app(state), r#"{"input_text": ""}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["logits"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn extra_fields_are_ignored() {
        let (state, _) = test_state(Mode::Generative, false);
        let (status, _) = send(app(state), r#"{"input_text": "cat", "lang": "en"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_input_text_is_rejected_before_inference() {
        let (state, calls) = test_state(Mode::Generative, false);
        let (status, json) = send(app(state), r#"{"text": "a black cat"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_type_and_malformed_json_are_rejected() {
        let (state, calls) = test_state(Mode::Generative, false);
        let router = app(state);
        let (status, _) = send(router.clone(), r#"{"input_text": 42}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(router, r#"{"input_text": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inference_failure_is_a_server_error() {
        let (state, _) = test_state(Mode::Generative, true);
        let (status, json) = send(app(state), r#"{"input_text": "cat"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["type"], "server_error");
        assert!(json["error"]["message"].as_str().unwrap().contains("device lost"));
    }

    #[tokio::test]
    async fn concurrent_identical_requests_agree() {
        let (state, _) = test_state(Mode::Generative, false);
        let router = app(state);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let router = router.clone();
                tokio::spawn(async move { send(router, r#"{"input_text": "black cat"}"#).await })
            })
            .collect();

        let mut results = Vec::new();
        for h in handles {
            let (status, json) = h.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            results.push(json);
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}
