use crate::api::error::AppError;
use crate::utils::validation::split_name;
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct EncryptResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub download_url: String,
    pub original_file_name: String,
    pub encrypted_file_name: String,
    pub expires_at: DateTime<Utc>,
    pub valid_for: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenInfoResponse {
    pub token: String,
    pub original_file_name: String,
    pub encrypted_file_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

/// `report.txt` is presented as `report.cif` once encrypted. Presentation
/// only; storage names come from the token.
fn encrypted_name(original_name: &str, output_extension: &str) -> String {
    let (base, _) = split_name(original_name);
    format!("{}{}", base, output_extension)
}

#[utoipa::path(
    post,
    path = "/api/cipher/encrypt",
    request_body(content = Multipart, description = "File to encrypt"),
    responses(
        (status = 200, description = "File encrypted and token issued", body = EncryptResponse),
        (status = 400, description = "Missing, empty or non-.txt file"),
        (status = 500, description = "Encryption failed")
    ),
    tag = "cipher"
)]
pub async fn encrypt_file(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<EncryptResponse>, AppError> {
    let mut payload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("unnamed").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            payload = Some((file_name, data.to_vec()));
        }
    }

    let (file_name, data) =
        payload.ok_or_else(|| AppError::BadRequest("missing 'file' field".to_string()))?;

    let entry = state.exchange.process(&data, &file_name).await?;

    Ok(Json(EncryptResponse {
        success: true,
        message: "File encrypted successfully".to_string(),
        download_url: format!("/api/cipher/download/{}", entry.token),
        token: entry.token,
        original_file_name: file_name,
        encrypted_file_name: encrypted_name(&entry.original_name, &state.config.output_extension),
        expires_at: entry.expires_at,
        valid_for: format!("{} hours", state.config.token_ttl_hours),
    }))
}

#[utoipa::path(
    get,
    path = "/api/cipher/download/{token}",
    params(
        ("token" = String, Path, description = "Download token")
    ),
    responses(
        (status = 200, description = "Encrypted file contents"),
        (status = 404, description = "Token not valid or file expired")
    ),
    tag = "cipher"
)]
pub async fn download_file(
    State(state): State<crate::AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let (data, original_name) = state.exchange.redeem(&token).await?;
    let attachment = encrypted_name(&original_name, &state.config.output_extension);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            mime::APPLICATION_OCTET_STREAM.as_ref(),
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment),
        )
        .body(Body::from(data))
        .unwrap())
}

#[utoipa::path(
    get,
    path = "/api/cipher/info/{token}",
    params(
        ("token" = String, Path, description = "Download token")
    ),
    responses(
        (status = 200, description = "Token metadata", body = TokenInfoResponse),
        (status = 404, description = "Token not valid or file expired")
    ),
    tag = "cipher"
)]
pub async fn token_info(
    State(state): State<crate::AppState>,
    Path(token): Path<String>,
) -> Result<Json<TokenInfoResponse>, AppError> {
    let entry = state.exchange.describe(&token).await?;

    Ok(Json(TokenInfoResponse {
        expired: entry.is_expired(),
        encrypted_file_name: encrypted_name(&entry.original_name, &state.config.output_extension),
        token: entry.token,
        original_file_name: entry.original_name,
        created_at: entry.created_at,
        expires_at: entry.expires_at,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/cipher/{token}",
    params(
        ("token" = String, Path, description = "Download token")
    ),
    responses(
        (status = 204, description = "Token revoked (or was already gone)")
    ),
    tag = "cipher"
)]
pub async fn revoke_token(
    State(state): State<crate::AppState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    state.exchange.revoke(&token).await;
    StatusCode::NO_CONTENT
}
