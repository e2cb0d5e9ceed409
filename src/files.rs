//! 文件上传、列表、下载与删除处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Form, Multipart, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::ApiError;
use crate::http::redirect_found;
use crate::storage::Storage;

const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub(crate) struct FilenameParams {
    filename: Option<String>,
}

impl FilenameParams {
    fn required(self) -> Result<String, ApiError> {
        self.filename
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("filename is required".into()))
    }
}

/// 接收 multipart 表单中的 `file` 字段并写入存储目录。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Failed to read file".into()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Failed to read file".into()))?;
        let size = storage.upload(&filename, field).await?;
        info!(filename, size, "upload file");
        return Ok(redirect_found("/"));
    }

    Err(ApiError::BadRequest("Failed to read file".into()))
}

/// 以 JSON 数组返回存储目录下的文件名。
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<String>>, ApiError> {
    let names = storage.list().await?;
    info!(count = names.len(), "list files");
    Ok(JsonResponse(names))
}

/// 删除表单字段 `filename` 指定的文件。
pub async fn delete_file(
    Extension(storage): Extension<Arc<Storage>>,
    Form(params): Form<FilenameParams>,
) -> Result<Response, ApiError> {
    let filename = params.required()?;
    storage.delete(&filename).await?;
    info!(filename, "delete file");
    Ok(redirect_found("/"))
}

/// 以附件形式流式下载文件。
pub async fn download_file(
    Extension(storage): Extension<Arc<Storage>>,
    Query(params): Query<FilenameParams>,
) -> Result<Response, ApiError> {
    let filename = params.required()?;
    let (file, size) = storage.open(&filename).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        attachment_header(&filename)?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));

    info!(filename, size, "download file");
    let stream = ReaderStream::new(file);
    Ok((StatusCode::OK, headers, AxumBody::from_stream(stream)).into_response())
}

fn attachment_header(filename: &str) -> Result<HeaderValue, ApiError> {
    let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("attachment; filename=\"{quoted}\"").as_bytes())
        .map_err(|_| ApiError::BadRequest("invalid file name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("files");
        std::fs::create_dir_all(&root).expect("create storage root");
        (temp, Arc::new(Storage::new(root)))
    }

    #[test]
    fn attachment_header_quotes_name() {
        assert_eq!(
            attachment_header("report.txt").expect("header"),
            "attachment; filename=\"report.txt\""
        );
        assert_eq!(
            attachment_header("say \"hi\".txt").expect("header"),
            "attachment; filename=\"say \\\"hi\\\".txt\""
        );
        assert!(attachment_header("line\nbreak").is_err());
    }

    #[tokio::test]
    async fn download_requires_filename() {
        let (_temp, storage) = make_storage();
        let result = download_file(
            Extension(storage),
            Query(FilenameParams { filename: None }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn download_rejects_traversal_name() {
        let (_temp, storage) = make_storage();
        let result = download_file(
            Extension(storage),
            Query(FilenameParams {
                filename: Some("../secret.txt".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delete_missing_file_is_not_found() {
        let (_temp, storage) = make_storage();
        let result = delete_file(
            Extension(storage),
            Form(FilenameParams {
                filename: Some("absent.txt".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
