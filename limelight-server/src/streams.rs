use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use limelight_core::NewStream;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewStreamSchema, ValidatedJson},
    serialized::{StreamEntry, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/streams",
    tag = "streams",
    responses(
        (status = 200, body = Vec<StreamEntry>)
    )
)]
pub(crate) async fn list_streams(
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<StreamEntry>>> {
    let streams = context.limelight.directory.list_active().await?;

    Ok(Json(streams.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/streams",
    tag = "streams",
    request_body = NewStreamSchema,
    responses(
        (status = 200, body = StreamEntry, description = "The active record for the room. Starting a stream twice returns the existing record.")
    )
)]
pub(crate) async fn start_stream(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewStreamSchema>,
) -> ServerResult<Json<StreamEntry>> {
    let stream = context
        .limelight
        .directory
        .start_stream(NewStream {
            room_id: body.room_id,
            streamer_name: body.streamer_name,
            title: body.title,
            kind: body.stream_type,
            price: body.price,
        })
        .await?;

    Ok(Json(stream.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/streams/{room_id}",
    tag = "streams",
    responses(
        (status = 200, body = StreamEntry),
        (status = 404, description = "The room has no active stream")
    )
)]
pub(crate) async fn stream(
    State(context): State<ServerContext>,
    Path(room_id): Path<String>,
) -> ServerResult<Json<StreamEntry>> {
    let stream = context.limelight.directory.stream(&room_id).await?;

    Ok(Json(stream.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/streams/{room_id}/end",
    tag = "streams",
    responses(
        (status = 200, description = "The stream record was closed, or was not active to begin with.")
    )
)]
pub(crate) async fn end_stream(
    State(context): State<ServerContext>,
    Path(room_id): Path<String>,
) -> ServerResult<()> {
    context.limelight.directory.end_stream(&room_id).await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_streams).post(start_stream))
        .route("/:room_id", get(stream))
        .route("/:room_id/end", post(end_stream))
}
