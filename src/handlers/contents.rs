use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web::{Data, Path};
use actix_web::{get, HttpResponse};
use uuid::Uuid;

use crate::errors::ContentError;
use crate::handlers::Caller;
use crate::models::common::ApiResponse;
use crate::services::content_gate::{ContentGate, Download};

fn disposition(kind: DispositionType, filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: kind,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

/// Full image for subscribers, watermarked preview for everyone else.
#[get("/{content_id}/image")]
pub async fn view_content(
    gate: Data<ContentGate>,
    caller: Caller,
    path: Path<Uuid>,
) -> Result<HttpResponse, ContentError> {
    let asset = gate.resolve_view(caller.0, path.into_inner()).await?;

    Ok(HttpResponse::Ok()
        .content_type(asset.format.mime_type())
        .insert_header(disposition(DispositionType::Inline, asset.filename))
        .insert_header(("X-Watermarked", if asset.watermarked { "true" } else { "false" }))
        .body(asset.bytes))
}

#[get("/{content_id}/download")]
pub async fn download_content(
    gate: Data<ContentGate>,
    caller: Caller,
    path: Path<Uuid>,
) -> Result<HttpResponse, ContentError> {
    match gate.download(caller.0, path.into_inner()).await? {
        Download::File { bytes, filename } => Ok(HttpResponse::Ok()
            .content_type("application/octet-stream")
            .insert_header(disposition(DispositionType::Attachment, filename))
            .body(bytes)),
        Download::Denied => Ok(HttpResponse::Forbidden().json(ApiResponse::error(
            "an active subscription is required to download this content".to_string(),
        ))),
    }
}
