use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body shape shared by every endpoint. `data` is omitted on errors.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(
        status: StatusCode,
        message: impl Into<String>,
        data: T,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                code: status.as_u16(),
                message: message.into(),
                data: Some(data),
            }),
        )
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        code: status.as_u16(),
        message: message.into(),
        data: None,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_data() {
        let body = ApiResponse::<()> {
            code: 401,
            message: "unauthorized".into(),
            data: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "code": 401, "message": "unauthorized" }));
    }

    #[test]
    fn success_envelope_carries_data() {
        let (status, Json(body)) = ApiResponse::success(StatusCode::CREATED, "ok", vec![1, 2]);
        assert_eq!(status, StatusCode::CREATED);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], 201);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
