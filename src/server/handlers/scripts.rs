//! Upload and evaluation of answer scripts.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error, info, warn};

use super::super::markup::render_evaluation;
use super::super::session::{
    encode_flashes, redirect_with_flash, set_cookie, CurrentUser, Flash, FlashCategory, Flashes,
    FLASH_COOKIE,
};
use super::super::template_structs::{EvaluateTemplate, NavUser};
use super::super::AppState;
use super::{error_page, internal_error, page_not_found, render_page};
use crate::models::NewAnswerScript;
use crate::services::extract_total_marks;
use crate::storage::{SavedFile, StorageError};

const MISSING_FILES: &str = "Please upload both knowledge base and at least one answer sheet.";
const KB_FAILED: &str = "Failed to extract text from Knowledge Base PDF.";

/// A file field read from the multipart body.
struct UploadedFile {
    filename: String,
    content: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    knowledge_base: Option<UploadedFile>,
    answer_sheets: Vec<UploadedFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().unwrap_or_default().to_string();
            let content = field.bytes().await?.to_vec();
            let file = UploadedFile { filename, content };

            match name.as_str() {
                "knowledge_base" if form.knowledge_base.is_none() => {
                    form.knowledge_base = Some(file)
                }
                "answer_sheet" => form.answer_sheets.push(file),
                other => debug!("Ignoring form field {:?}", other),
            }
        }

        Ok(form)
    }

    fn is_complete(&self) -> bool {
        let kb_ok = self
            .knowledge_base
            .as_ref()
            .is_some_and(|kb| !kb.filename.is_empty());
        let answer_ok = self
            .answer_sheets
            .first()
            .is_some_and(|a| !a.filename.is_empty());
        kb_ok && answer_ok
    }
}

pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected upload from {}: {}", user.email, e);
            return error_page(e.status(), "Upload Failed", &e.body_text());
        }
    };

    if !form.is_complete() {
        return redirect_with_flash("/dashboard", FlashCategory::Danger, MISSING_FILES);
    }

    let upload = match state.uploads.create_upload().await {
        Ok(upload) => upload,
        Err(e) => {
            error!("Failed to create upload directory: {}", e);
            return internal_error();
        }
    };

    let mut flashes = Vec::new();

    // Saved before the answers so an answer with the same name gets a suffix
    let kb_saved = match &form.knowledge_base {
        Some(kb) => match upload.save(&kb.filename, &kb.content).await {
            Ok(saved) => Some(saved),
            Err(StorageError::InvalidFilename(name)) => {
                warn!("Knowledge base has unusable name {:?}", name);
                None
            }
            Err(e) => {
                error!("Failed to save knowledge base: {}", e);
                return internal_error();
            }
        },
        None => None,
    };

    let mut answers: Vec<SavedFile> = Vec::new();
    for sheet in &form.answer_sheets {
        match upload.save(&sheet.filename, &sheet.content).await {
            Ok(saved) => answers.push(saved),
            Err(StorageError::InvalidFilename(name)) => {
                debug!("Skipping answer sheet with unusable name {:?}", name)
            }
            Err(e) => {
                error!("Failed to save answer sheet: {}", e);
                return internal_error();
            }
        }
    }

    let Some(first) = answers.first() else {
        return redirect_with_flash("/dashboard", FlashCategory::Danger, MISSING_FILES);
    };

    let paths: Vec<_> = answers.iter().map(|a| a.path.clone()).collect();
    let (kb_text, extracted_text) = match &kb_saved {
        Some(kb) => {
            let prepared = state.grading.prepare(&kb.path, &paths).await;
            if prepared.kb_error.is_some() {
                flashes.push(Flash::new(FlashCategory::Warning, KB_FAILED));
            }
            (prepared.kb_text, prepared.extracted_text)
        }
        None => {
            flashes.push(Flash::new(FlashCategory::Warning, KB_FAILED));
            (String::new(), state.grading.answer_text(&paths).await)
        }
    };

    let created = state
        .db
        .scripts()
        .create(&NewAnswerScript {
            user_id: user.id,
            filename: first.filename.clone(),
            file_path: first.relative_path.clone(),
            kb_text,
            extracted_text,
        })
        .await;

    let script = match created {
        Ok(script) => script,
        Err(e) => {
            error!("Failed to store answer script: {}", e);
            return internal_error();
        }
    };

    info!(
        "User {} uploaded script {} ({} answer files)",
        user.email,
        script.id,
        answers.len()
    );

    let location = format!("/evaluate/{}", script.id);
    if flashes.is_empty() {
        Redirect::to(&location).into_response()
    } else {
        let cookie = set_cookie(FLASH_COOKIE, &encode_flashes(&flashes));
        ([(header::SET_COOKIE, cookie)], Redirect::to(&location)).into_response()
    }
}

/// Show a script's evaluation, computing and caching it on first view.
pub async fn evaluate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(script_id): Path<String>,
    flashes: Flashes,
) -> Response {
    let Ok(script_id) = script_id.parse::<i32>() else {
        return page_not_found();
    };

    let scripts = state.db.scripts();
    let script = match scripts.get(script_id).await {
        Ok(Some(script)) => script,
        Ok(None) => return page_not_found(),
        Err(e) => {
            error!("Failed to load script {}: {}", script_id, e);
            return internal_error();
        }
    };

    if !user.can_view(script.user_id) {
        warn!("User {} denied access to script {}", user.email, script.id);
        return redirect_with_flash(
            "/dashboard",
            FlashCategory::Danger,
            "You do not have permission to view this.",
        );
    }

    let evaluation = match script.cached_evaluation() {
        Some(cached) => cached.to_string(),
        None => {
            let fresh = state
                .grading
                .evaluate(&script.kb_text, &script.extracted_text)
                .await;
            match scripts.store_evaluation(script.id, &fresh).await {
                Ok(stored) => stored,
                Err(e) => {
                    error!("Failed to store evaluation for {}: {}", script.id, e);
                    return internal_error();
                }
            }
        }
    };

    let template = EvaluateTemplate {
        title: "Evaluation",
        flashes: flashes.0.clone(),
        user: Some(NavUser::from(&user)),
        script_id: script.id,
        filename: script.filename.clone(),
        total_marks: extract_total_marks(&evaluation),
        evaluation_html: render_evaluation(&evaluation),
        extracted_text: script.extracted_text.clone(),
    };
    render_page(&template, &flashes)
}
