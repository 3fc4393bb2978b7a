use actix_multipart::Multipart;
use actix_web::{
    web::{self, Path},
    HttpResponse, Responder,
};
use futures::TryStreamExt;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::model::{
    TemplateActionResponse, TemplateRecord, UploadTemplateForm, UploadTemplateResponse,
};
use super::validator::MAX_TEMPLATE_BYTES;
use super::TemplateError;
use crate::db::AppState;
use crate::ErrorResponse;

/// Fields pulled out of the upload form.
#[derive(Debug, Default)]
pub struct TemplateUpload {
    pub bytes: Vec<u8>,
    pub display_name: String,
    pub uploaded_by: String,
}

/// Read the `file`, `name` and `uploaded_by` fields.
///
/// File bytes are buffered up to one byte past the size limit so the
/// validator reports the size error instead of the request being truncated.
async fn read_upload_form(mut payload: Multipart) -> Result<TemplateUpload, String> {
    let mut upload = TemplateUpload::default();
    let mut has_file = false;

    while let Some(mut field) = payload.try_next().await.map_err(|e| e.to_string())? {
        let content_disposition = field
            .content_disposition()
            .ok_or("Content-Disposition not set")?;
        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| "No field name".to_string())?
            .to_string();

        match field_name.as_str() {
            "file" => {
                has_file = true;
                while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
                    if upload.bytes.len() <= MAX_TEMPLATE_BYTES {
                        let room = MAX_TEMPLATE_BYTES + 1 - upload.bytes.len();
                        upload
                            .bytes
                            .extend_from_slice(&chunk[..chunk.len().min(room)]);
                    }
                }
                debug!("Received template file of {} bytes", upload.bytes.len());
            }
            "name" | "uploaded_by" => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
                    bytes.extend_from_slice(&chunk);
                }
                let value = String::from_utf8(bytes).map_err(|e| e.to_string())?;
                if field_name == "name" {
                    upload.display_name = value.trim().to_string();
                } else {
                    upload.uploaded_by = value.trim().to_string();
                }
            }
            _ => {
                while field.try_next().await.map_err(|e| e.to_string())?.is_some() {}
            }
        }
    }

    if !has_file {
        return Err("No file was uploaded".to_string());
    }
    if upload.uploaded_by.is_empty() {
        upload.uploaded_by = "admin".to_string();
    }
    Ok(upload)
}

pub fn template_error_response(err: &TemplateError) -> HttpResponse {
    match err {
        TemplateError::Upload(reason) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("UploadError", reason))
        }
        TemplateError::Storage(_) => {
            error!("Template storage failure: {}", err);
            HttpResponse::BadGateway().json(ErrorResponse::new("UploadError", &err.to_string()))
        }
        TemplateError::InvalidState(reason) => {
            warn!("Template state transition refused: {}", reason);
            HttpResponse::Conflict().json(ErrorResponse::new("InvalidStateError", reason))
        }
        TemplateError::NotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&err.to_string()))
        }
        TemplateError::Database(_) => {
            error!("Template database failure: {}", err);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to update templates"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates",
    request_body(content = inline(UploadTemplateForm), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Template uploaded and activated", body = UploadTemplateResponse),
        (status = 400, description = "Template rejected", body = ErrorResponse),
        (status = 502, description = "Template file could not be stored", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn upload_template(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing upload_template handler");
    let upload = match read_upload_form(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Malformed template upload: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e));
        }
    };

    match data
        .templates
        .upload(&upload.bytes, &upload.display_name, &upload.uploaded_by)
        .await
    {
        Ok(record) => HttpResponse::Created().json(UploadTemplateResponse::from(&record)),
        Err(e) => template_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "All templates, newest first", body = [TemplateRecord]),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_templates(data: web::Data<AppState>) -> impl Responder {
    info!("Executing list_templates handler");
    match data.templates.list().await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => template_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates/active",
    responses(
        (status = 200, description = "The active template", body = TemplateRecord),
        (status = 404, description = "No template is active", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn get_active_template(data: web::Data<AppState>) -> impl Responder {
    info!("Executing get_active_template handler");
    match data.templates.get_active().await {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found("No active template")),
        Err(e) => template_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates/{id}/activate",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template activated", body = TemplateActionResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn activate_template(path: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = path.into_inner();
    info!("Executing activate_template handler for {}", id);
    match data.templates.activate(id).await {
        Ok(record) => {
            info!("Template {} ({}) is now active", record.id, record.display_name);
            HttpResponse::Ok().json(TemplateActionResponse::ok("Template activated"))
        }
        Err(e) => template_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template deactivated", body = TemplateActionResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 409, description = "Template already inactive", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn deactivate_template(path: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = path.into_inner();
    info!("Executing deactivate_template handler for {}", id);
    match data.templates.deactivate(id).await {
        Ok(()) => HttpResponse::Ok().json(TemplateActionResponse::ok("Template deactivated")),
        Err(e) => template_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    delete,
    path = "/templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template deleted", body = TemplateActionResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 409, description = "Template is active", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn delete_template(path: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = path.into_inner();
    info!("Executing delete_template handler for {}", id);
    match data.templates.delete(id).await {
        Ok(()) => HttpResponse::Ok().json(TemplateActionResponse::ok("Template deleted")),
        Err(e) => template_error_response(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/templates")
            .route(web::get().to(list_templates))
            .route(web::post().to(upload_template)),
    )
    .service(web::resource("/templates/active").route(web::get().to(get_active_template)))
    .service(
        web::resource("/templates/{id}/activate").route(web::post().to(activate_template)),
    )
    .service(
        web::resource("/templates/{id}/deactivate").route(web::post().to(deactivate_template)),
    )
    .service(web::resource("/templates/{id}").route(web::delete().to(delete_template)));
}
