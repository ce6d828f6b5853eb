//! Contact form endpoints.
//!
//! Both handlers run the same linear pipeline: validate the required fields, check the bot
//! is configured, sanitize free text, format the HTML notification and hand it to the
//! [`Notifier`](crate::notifier::Notifier). `/send-file` additionally stores the attached
//! file for the duration of the request and always deletes it before responding.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
};
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::{
        RelayResponse,
        submissions::{FileSubmission, SendFileForm, SendMessageRequest},
    },
    config::{BotCredentials, Config},
    errors::{Error, Result},
    notifier::{NotificationResult, format},
    sanitize::sanitize,
    uploads::UploadStore,
};

/// Multipart field that carries the attachment
const FILE_FIELD: &str = "file";

/// Submit a text-only contact form
#[utoipa::path(
    post,
    path = "/send-message",
    tag = "submissions",
    summary = "Send a contact message",
    description = "Relays a contact form submission to the configured chat.",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message delivered", body = RelayResponse),
        (status = 400, description = "Missing fields or malformed body", body = RelayResponse),
        (status = 500, description = "Server misconfigured or delivery failed", body = RelayResponse),
    )
)]
#[instrument(skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>> {
    let Json(request) = payload.map_err(|e| Error::BadRequest { message: e.body_text() })?;
    let submission = request.validate()?;
    let bot = bot_credentials(&state.config)?;

    let text = format::contact_message(
        &sanitize(Some(&submission.name)),
        &sanitize(Some(&submission.email)),
        &sanitize(Some(&submission.message)),
    );
    let result = state.notifier.send_text(bot, &text).await?;
    ensure_delivered("sendMessage", result)?;

    info!("Relayed contact message");
    Ok(Json(RelayResponse::success("Message sent successfully")))
}

/// Submit a contact form with an optional attachment
#[utoipa::path(
    post,
    path = "/send-file",
    tag = "submissions",
    summary = "Send a file",
    description = "Relays a contact form submission with one attached file. Images are sent as photos, \
                   everything else as documents. Without a file the explanation is sent as a text message.",
    request_body(content = SendFileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Submission delivered", body = RelayResponse),
        (status = 400, description = "Missing fields, file too large or file type not allowed", body = RelayResponse),
        (status = 500, description = "Server misconfigured or delivery failed", body = RelayResponse),
    )
)]
#[instrument(skip_all)]
pub async fn send_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<RelayResponse>> {
    let mut multipart = multipart.map_err(|e| Error::BadRequest { message: e.body_text() })?;
    let submission = parse_file_submission(&state.uploads, &mut multipart).await?;

    let upload = submission.file.clone();
    let outcome = relay_file_submission(&state, submission).await;

    // Cleanup runs whatever the outcome of the relay
    if let Some(upload) = upload {
        state.uploads.remove(&upload).await;
    }

    outcome.map(|message| Json(RelayResponse::success(message)))
}

async fn relay_file_submission(state: &AppState, submission: FileSubmission) -> Result<&'static str> {
    let (name, email) = submission.required_fields()?;
    let bot = bot_credentials(&state.config)?;

    let name = sanitize(Some(name));
    let email = sanitize(Some(email));
    let explanation = sanitize(submission.explanation.as_deref());

    let Some(upload) = &submission.file else {
        let text = format::contact_message(&name, &email, &explanation);
        let result = state.notifier.send_text(bot, &text).await?;
        ensure_delivered("sendMessage", result)?;

        info!("Relayed contact message without attachment");
        return Ok("Message sent successfully");
    };

    let is_image = upload.is_image();
    let method = if is_image { "sendPhoto" } else { "sendDocument" };
    let caption = format::file_caption(&name, &email, &explanation);

    let attachment = state.uploads.open(upload).await?;
    let result = state.notifier.send_file(bot, attachment, &caption, is_image).await?;
    ensure_delivered(method, result)?;

    info!(
        mime_type = %upload.mime_type,
        size_bytes = upload.size_bytes,
        "Relayed file submission"
    );
    Ok("File sent successfully")
}

/// Collect the form. If anything goes wrong after the file was stored, the file is
/// deleted before the error is returned.
async fn parse_file_submission(uploads: &UploadStore, multipart: &mut Multipart) -> Result<FileSubmission> {
    let mut form = FileSubmission::default();

    if let Err(e) = read_form(uploads, multipart, &mut form).await {
        if let Some(upload) = &form.file {
            uploads.remove(upload).await;
        }
        return Err(e);
    }

    Ok(form)
}

async fn read_form(uploads: &UploadStore, multipart: &mut Multipart, form: &mut FileSubmission) -> Result<()> {
    while let Some(field) = multipart.next_field().await.map_err(|e| uploads.multipart_error(e))? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name.as_deref() {
            // Browsers send an empty file input as a part with an empty file name
            Some("") => continue,
            Some(_) if field_name == FILE_FIELD && form.file.is_none() => {
                form.file = Some(uploads.save_field(field).await?);
            }
            Some(_) => {
                return Err(Error::Upload {
                    message: "Unexpected field".to_string(),
                });
            }
            None => {
                let value = field.text().await.map_err(|e| uploads.multipart_error(e))?;
                match field_name.as_str() {
                    "name" => form.name = Some(value),
                    "email" => form.email = Some(value),
                    "explanation" => form.explanation = Some(value),
                    _ => tracing::debug!(field = %field_name, "Ignoring unknown form field"),
                }
            }
        }
    }

    Ok(())
}

fn bot_credentials(config: &Config) -> Result<BotCredentials<'_>> {
    config
        .telegram
        .credentials()
        .map_err(|missing| Error::Configuration { missing })
}

fn ensure_delivered(method: &'static str, result: NotificationResult) -> Result<()> {
    if result.ok {
        Ok(())
    } else {
        Err(Error::Upstream {
            method,
            response: result.raw,
        })
    }
}
