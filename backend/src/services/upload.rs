use crate::error::{ApiResult, AppError};
use crate::import::file_reader::UploadedFile;
use actix_multipart::Multipart;
use futures_util::StreamExt;
use log::debug;
use md5::Context;

/// An uploaded file with the md5 of its bytes.
pub(crate) struct Upload {
    pub file: UploadedFile,
    pub checksum: String,
}

/// The declared content type, or one guessed from the file name when the
/// client sent none or a generic one.
fn content_type(declared: Option<&mime_guess::Mime>, file_name: &str) -> String {
    match declared {
        Some(mime) if mime.essence_str() != "application/octet-stream" => {
            mime.essence_str().to_string()
        }
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Reads the `file` part of a multipart body, refusing more than `limit`
/// bytes. Other parts are drained and ignored.
pub(crate) async fn read_file(mut payload: Multipart, limit: usize) -> ApiResult<Upload> {
    let mut upload = None;
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") || upload.is_some() {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        let content_type = content_type(field.content_type(), &file_name);

        let mut md5_hasher = Context::new();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::BadRequest(format!(
                    "The file is larger than {limit} bytes"
                )));
            }
            md5_hasher.consume(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let checksum = format!("{:x}", md5_hasher.finalize());
        debug!("received {file_name} ({content_type}, {} bytes, md5 {checksum})", bytes.len());
        upload = Some(Upload {
            file: UploadedFile {
                file_name,
                content_type,
                bytes,
            },
            checksum,
        });
    }
    upload.ok_or_else(|| AppError::BadRequest("No file was submitted in the 'file' field".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("text/csv"), "a.bin", "text/csv")]
    #[case(Some("application/octet-stream"), "sites.csv", "text/csv")]
    #[case(None, "sites.xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")]
    #[case(None, "noextension", "application/octet-stream")]
    fn content_type_falls_back_to_the_file_name(
        #[case] declared: Option<&str>,
        #[case] file_name: &str,
        #[case] expected: &str,
    ) {
        let declared: Option<mime_guess::Mime> = declared.map(|d| d.parse().unwrap());
        assert_eq!(content_type(declared.as_ref(), file_name), expected);
    }
}
