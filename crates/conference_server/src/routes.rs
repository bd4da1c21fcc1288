//! REST handlers shared by every resource family.
//!
//! Each family exposes the same six operations under `Resource::PATH`:
//! create, list, read, replace, merge-patch and delete.

use crate::error::ApiError;
use crate::state::{AppState, Resource};
use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::header::{CONTENT_TYPE, HOST, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use conference_core::paging::{LINK_HEADER, TOTAL_COUNT_HEADER};
use conference_core::{
    page_request_for, pagination_headers, EntityId, FetchMode, Payload, Room, Talk, Timeslot,
};
use log::debug;
use serde::Serialize;

const JSON: &str = "application/json";
const MERGE_PATCH_JSON: &str = "application/merge-patch+json";
const FORWARDED_PROTO: &str = "x-forwarded-proto";
const EAGER_LOAD_PARAM: &str = "eagerload";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/management/health", get(health))
        .merge(resource_routes::<Room>())
        .merge(resource_routes::<Timeslot>())
        .merge(resource_routes::<Talk>())
        .with_state(state)
}

fn resource_routes<E: Resource>() -> Router<AppState> {
    Router::new()
        .route(E::PATH, get(list::<E>).post(create::<E>))
        .route(
            &format!("{}/{{id}}", E::PATH),
            get(read::<E>)
                .put(replace::<E>)
                .patch(patch::<E>)
                .delete(remove::<E>),
        )
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "UP" })
}

async fn create<E: Resource>(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_content_type::<E>(&headers, &[JSON])?;
    let payload = parse_payload::<E>(&body)?;

    let stored = state.run::<E, _, _>(move |service| service.create(payload)).await?;
    let location = format!("{}/{}", E::PATH, stored.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(stored)).into_response())
}

async fn list<E: Resource>(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let request = page_request_for::<E>(&pairs, state.paging)?;
    let mode = fetch_mode(&pairs);
    debug!(
        "event=http_list module=server status=start entity={} page={} size={}",
        E::NAME,
        request.page,
        request.size
    );

    let page = state
        .run::<E, _, _>(move |service| service.list(&request, mode))
        .await?;

    let base_uri = format!("{}{}", origin(&headers), uri.path());
    let links = pagination_headers(&base_uri, uri.query(), &page);
    let mut response = Json(page.content).into_response();
    insert_header(response.headers_mut(), TOTAL_COUNT_HEADER, &links.total_count)?;
    insert_header(response.headers_mut(), LINK_HEADER, &links.link)?;
    Ok(response)
}

async fn read<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<Response, ApiError> {
    match state.run::<E, _, _>(move |service| service.get(id)).await? {
        Some(stored) => Ok(Json(stored).into_response()),
        None => Err(ApiError::not_found(E::NAME)),
    }
}

async fn replace<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_content_type::<E>(&headers, &[JSON])?;
    let payload = parse_payload::<E>(&body)?;

    let stored = state
        .run::<E, _, _>(move |service| service.replace(id, payload))
        .await?;
    Ok(Json(stored).into_response())
}

async fn patch<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_content_type::<E>(&headers, &[JSON, MERGE_PATCH_JSON])?;
    let payload = parse_payload::<E>(&body)?;

    let stored = state
        .run::<E, _, _>(move |service| service.partial_update(id, payload))
        .await?;
    Ok(Json(stored).into_response())
}

async fn remove<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
    state.run::<E, _, _>(move |service| service.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_content_type<E: Resource>(headers: &HeaderMap, accepted: &[&str]) -> Result<(), ApiError> {
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match media_type {
        Some(media_type) if accepted.contains(&media_type.as_str()) => Ok(()),
        _ => Err(ApiError::unsupported_media_type(E::NAME)),
    }
}

fn parse_payload<E: Resource>(body: &[u8]) -> Result<Payload<E::Patch>, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::body_invalid(E::NAME, err))
}

// Anything other than an explicit `false` keeps the eager default.
fn fetch_mode(pairs: &[(String, String)]) -> FetchMode {
    let eager = pairs
        .iter()
        .find(|(key, _)| key == EAGER_LOAD_PARAM)
        .map_or(true, |(_, value)| !value.trim().eq_ignore_ascii_case("false"));
    FetchMode::from_eager_flag(eager)
}

fn origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ApiError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| ApiError::internal(format!("bad header name {name}: {err}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| ApiError::internal(format!("bad header value for {name}: {err}")))?;
    headers.insert(name, value);
    Ok(())
}
