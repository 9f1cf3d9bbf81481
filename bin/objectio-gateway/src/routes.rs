//! Gateway API handlers (spec §6 "Gateway API").

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use axum::routing::{delete, get, post, put};
use bytes::Bytes;
use objectio_common::{Consistency, Error};
use objectio_pipeline::Gateway;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/buckets", post(create_bucket).get(list_buckets))
        .route(
            "/buckets/{bucket}/objects/{key}",
            put(put_object).get(get_object).delete(delete_object),
        )
        .route("/buckets/{bucket}/objects/{key}/uploads", post(initiate_upload))
        .route(
            "/buckets/{bucket}/objects/{key}/uploads/{upload_id}/parts/{part_number}",
            put(upload_part),
        )
        .route(
            "/buckets/{bucket}/objects/{key}/uploads/{upload_id}/complete",
            post(complete_upload),
        )
        .route(
            "/buckets/{bucket}/objects/{key}/uploads/{upload_id}",
            delete(abort_upload),
        )
        .route("/admin/metrics", get(admin_metrics))
        .route("/admin/health", get(admin_health))
        .route("/admin/gc/status", get(admin_gc_status))
        .route("/admin/gc", post(admin_gc_trigger))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .with_state(gateway)
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        if let Error::QuotaExceeded { used, limit, .. } = &self.0 {
            let mut response = (status, body).into_response();
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&used.to_string()) {
                headers.insert("X-Quota-Used", v);
            }
            if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("X-Quota-Limit", v);
            }
            return response;
        }
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct CreateBucketBody {
    name: String,
    #[serde(default = "default_versioning")]
    versioning: bool,
}

fn default_versioning() -> bool {
    true
}

#[derive(Serialize)]
struct BucketDescriptor {
    name: String,
    versioning: bool,
    created_at: u64,
}

async fn create_bucket(
    State(gateway): State<Gateway>,
    Json(body): Json<CreateBucketBody>,
) -> ApiResult<Json<BucketDescriptor>> {
    let record = gateway
        .meta
        .create_bucket(&body.name, body.versioning, objectio_pipeline_now())?;
    Ok(Json(BucketDescriptor {
        name: record.name,
        versioning: record.versioning,
        created_at: record.created_at,
    }))
}

async fn list_buckets(State(gateway): State<Gateway>) -> ApiResult<Json<Vec<BucketDescriptor>>> {
    let buckets = gateway.meta.list_buckets()?;
    Ok(Json(
        buckets
            .into_iter()
            .map(|b| BucketDescriptor {
                name: b.name,
                versioning: b.versioning,
                created_at: b.created_at,
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
struct WriteQuery {
    consistency: Option<String>,
    region: Option<String>,
}

#[derive(Serialize)]
struct WriteResponse {
    version_id: String,
    deduplicated: bool,
    content_hash: String,
}

async fn extract_file_field(mut multipart: Multipart) -> ApiResult<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(Error::bad_request(e.to_string())))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError(Error::bad_request(e.to_string())));
        }
    }
    Err(ApiError(Error::bad_request("missing multipart field \"file\"")))
}

async fn put_object(
    State(gateway): State<Gateway>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<WriteQuery>,
    multipart: Multipart,
) -> ApiResult<Json<WriteResponse>> {
    let consistency = match query.consistency {
        Some(s) => Consistency::from_str(&s).map_err(Error::bad_request)?,
        None => Consistency::Strong,
    };
    let blob = extract_file_field(multipart).await?;

    let outcome = objectio_pipeline::write::put_object(
        &gateway,
        &bucket,
        &key,
        blob,
        consistency,
        query.region.as_deref(),
    )
    .await?;

    Ok(Json(WriteResponse {
        version_id: outcome.version_id.to_string(),
        deduplicated: outcome.deduplicated,
        content_hash: outcome.content_hash.as_str().to_string(),
    }))
}

#[derive(Deserialize)]
struct ReadQuery {
    version_id: Option<String>,
}

async fn get_object(
    State(gateway): State<Gateway>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<Bytes> {
    let (bytes, _version) = objectio_pipeline::read::get_object(
        &gateway,
        &bucket,
        &key,
        query.version_id.as_deref(),
    )
    .await?;
    Ok(bytes)
}

async fn delete_object(
    State(gateway): State<Gateway>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    objectio_pipeline::delete::delete_object(&gateway, &bucket, &key).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

#[derive(Serialize)]
struct UploadIdResponse {
    upload_id: String,
}

async fn initiate_upload(
    State(gateway): State<Gateway>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<Json<UploadIdResponse>> {
    let upload_id = objectio_pipeline::multipart::initiate_multipart(&gateway, &bucket, &key).await?;
    Ok(Json(UploadIdResponse { upload_id }))
}

async fn upload_part(
    State(gateway): State<Gateway>,
    Path((_bucket, _key, upload_id, part_number)): Path<(String, String, String, u32)>,
    multipart: Multipart,
) -> ApiResult<StatusCode> {
    let blob = extract_file_field(multipart).await?;
    objectio_pipeline::multipart::upload_part(&gateway, &upload_id, part_number, blob).await?;
    Ok(StatusCode::OK)
}

async fn complete_upload(
    State(gateway): State<Gateway>,
    Path((_bucket, _key, upload_id)): Path<(String, String, String)>,
    Query(query): Query<WriteQuery>,
) -> ApiResult<Json<WriteResponse>> {
    let consistency = match query.consistency {
        Some(s) => Consistency::from_str(&s).map_err(Error::bad_request)?,
        None => Consistency::Strong,
    };
    let outcome = objectio_pipeline::multipart::complete_multipart(
        &gateway,
        &upload_id,
        consistency,
        query.region.as_deref(),
    )
    .await?;
    Ok(Json(WriteResponse {
        version_id: outcome.version_id.to_string(),
        deduplicated: outcome.deduplicated,
        content_hash: outcome.content_hash.as_str().to_string(),
    }))
}

async fn abort_upload(
    State(gateway): State<Gateway>,
    Path((_bucket, _key, upload_id)): Path<(String, String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    objectio_pipeline::multipart::abort_multipart(&gateway, &upload_id).await?;
    Ok(Json(serde_json::json!({ "status": "aborted" })))
}

async fn admin_metrics(State(gateway): State<Gateway>) -> Json<serde_json::Value> {
    let buckets = gateway.meta.list_buckets().unwrap_or_default();
    Json(serde_json::json!({
        "bucket_count": buckets.len(),
        "node_count": gateway.registry.len(),
    }))
}

#[derive(Deserialize)]
struct HealthQuery {
    node_id: Option<String>,
}

async fn admin_health(
    State(gateway): State<Gateway>,
    Query(query): Query<HealthQuery>,
) -> Json<serde_json::Value> {
    let snapshot = gateway.health.snapshot();
    let entries: HashMap<String, serde_json::Value> = snapshot
        .into_iter()
        .filter(|(id, _)| query.node_id.as_deref().is_none_or(|want| want == id.as_str()))
        .map(|(id, record)| {
            (
                id.as_str().to_string(),
                serde_json::json!({
                    "status": format!("{:?}", record.status),
                    "last_probe_time": record.last_probe_time,
                    "last_rtt_ms": record.last_rtt_ms,
                    "last_error": record.last_error,
                }),
            )
        })
        .collect();
    Json(serde_json::json!({ "nodes": entries }))
}

async fn admin_gc_status(State(gateway): State<Gateway>) -> ApiResult<Json<serde_json::Value>> {
    let stale = gateway.meta.list_stale_versions(objectio_pipeline_now())?;
    Ok(Json(serde_json::json!({ "stale_versions": stale.len() })))
}

async fn admin_gc_trigger(
    State(gateway): State<Gateway>,
) -> ApiResult<Json<serde_json::Value>> {
    let retention_seconds = u64::from(gateway.config.versioning.retention_days) * 24 * 3600;
    let report = objectio_pipeline::gc::run_gc_once(&gateway, objectio_pipeline_now(), retention_seconds)
        .await?;
    Ok(Json(serde_json::json!({
        "versions_collected": report.versions_collected,
        "content_rows_freed": report.content_rows_freed,
        "shards_deleted": report.shards_deleted,
    })))
}

fn objectio_pipeline_now() -> u64 {
    objectio_pipeline::health::now_unix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_common::error::QuotaDimension;

    #[test]
    fn quota_exceeded_response_carries_usage_headers() {
        let err = ApiError(Error::QuotaExceeded {
            dimension: QuotaDimension::Objects,
            used: 2,
            limit: 1,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
        assert_eq!(response.headers().get("X-Quota-Used").unwrap(), "2");
        assert_eq!(response.headers().get("X-Quota-Limit").unwrap(), "1");
    }

    #[test]
    fn non_quota_error_response_carries_no_quota_headers() {
        let err = ApiError(Error::ObjectNotFound {
            bucket: "b".to_string(),
            key: "k".to_string(),
        });
        let response = err.into_response();
        assert!(response.headers().get("X-Quota-Used").is_none());
    }

    #[test]
    fn create_bucket_body_defaults_versioning_to_true_when_omitted() {
        let body: CreateBucketBody = serde_json::from_str(r#"{"name":"b"}"#).unwrap();
        assert!(body.versioning);
    }

    #[test]
    fn create_bucket_body_honors_explicit_versioning_false() {
        let body: CreateBucketBody =
            serde_json::from_str(r#"{"name":"b","versioning":false}"#).unwrap();
        assert!(!body.versioning);
    }
}
