use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;
use utoipauto::utoipauto;

#[utoipauto(paths = "./limelight-server/src")]
#[derive(OpenApi)]
#[openapi(info(
    description = "limelight-server exposes the stream directory and the signaling gateway"
))]
pub struct ApiDoc;

pub async fn serve_docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
