//! REST client for the generation backend.
//!
//! Wraps the backend's HTTP endpoints (project CRUD, generation start,
//! panel regeneration, characters, exports) using [`reqwest`]. Request
//! and response bodies use the backend's snake_case schema; the record
//! types convert into the editor's domain model.

use manga_core::model::{Character, MangaStyle, Project, ProjectStatus, TrainingStatus};
use manga_core::patch::PanelPatch;
use manga_core::types::{CharacterId, PanelId, ProjectId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// HTTP client for one backend.
pub struct MangaApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Status { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub title: String,
    pub synopsis: String,
    pub style: MangaStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<MangaStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCharacter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visual_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportOptions {
    /// `print` or `web`.
    pub export_format: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_format: "print".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Project row as returned by the backend. Carries no tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub synopsis: Option<String>,
    pub style: MangaStyle,
    pub status: ProjectStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectRecord {
    /// Convert to a domain project with an empty tree.
    pub fn into_project(self) -> Project {
        let mut project = Project::new(self.title, self.synopsis.unwrap_or_default(), self.style);
        project.id = self.id;
        project.status = self.status;
        project.created_at = self.created_at;
        project.updated_at = self.updated_at;
        project
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visual_description: String,
    #[serde(default)]
    pub reference_images: Vec<String>,
    #[serde(default)]
    pub lora_path: Option<String>,
    #[serde(default)]
    pub lora_status: TrainingStatus,
}

impl CharacterRecord {
    pub fn into_character(self) -> Character {
        let mut character = Character::new(
            self.name,
            self.description.unwrap_or_default(),
            self.visual_description,
        );
        character.id = self.id;
        character.reference_images = self.reference_images;
        character.lora_path = self.lora_path;
        character.lora_status = self.lora_status;
        character
    }
}

/// Response of `POST /generation/start/{project_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationStarted {
    pub project_id: ProjectId,
    pub task_id: String,
    pub status: String,
}

/// Response of `POST /generation/regenerate/panel/{panel_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PanelRegenerated {
    pub status: String,
    #[serde(default)]
    pub panel: serde_json::Value,
}

impl MangaApi {
    /// * `base_url` - API root, e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- projects ----

    pub async fn create_project(&self, project: &NewProject) -> Result<ProjectRecord, ApiError> {
        let response = self.post("/projects").json(project).send().await?;
        Self::parse_response(response).await
    }

    /// Projects of the authenticated user, most recently updated first.
    pub async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        let response = self.get("/projects").send().await?;
        Self::parse_response(response).await
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<ProjectRecord, ApiError> {
        let response = self.get(&format!("/projects/{id}")).send().await?;
        Self::parse_response(response).await
    }

    pub async fn update_project(
        &self,
        id: ProjectId,
        update: &ProjectUpdate,
    ) -> Result<ProjectRecord, ApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/projects/{id}"))
            .json(update)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/projects/{id}"))
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- generation ----

    pub async fn start_generation(&self, project_id: ProjectId) -> Result<GenerationStarted, ApiError> {
        let response = self
            .post(&format!("/generation/start/{project_id}"))
            .send()
            .await?;
        let started: GenerationStarted = Self::parse_response(response).await?;
        tracing::info!(project_id = %project_id, task_id = %started.task_id, "Generation started");
        Ok(started)
    }

    pub async fn regenerate_panel(
        &self,
        panel_id: PanelId,
        modifications: &PanelPatch,
    ) -> Result<PanelRegenerated, ApiError> {
        let response = self
            .post(&format!("/generation/regenerate/panel/{panel_id}"))
            .json(modifications)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- characters ----

    pub async fn create_character(
        &self,
        project_id: ProjectId,
        character: &NewCharacter,
    ) -> Result<CharacterRecord, ApiError> {
        let response = self
            .post(&format!("/characters/{project_id}"))
            .json(character)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Trigger model training for a character. Progress arrives later as
    /// `character_training` messages on the sync channel.
    pub async fn train_character(&self, character_id: CharacterId) -> Result<(), ApiError> {
        let response = self
            .post(&format!("/characters/{character_id}/train"))
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- exports ----

    pub async fn export_pdf(
        &self,
        project_id: ProjectId,
        options: &ExportOptions,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .post(&format!("/export/{project_id}/pdf"))
            .json(options)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn export_webtoon(&self, project_id: ProjectId) -> Result<serde_json::Value, ApiError> {
        let response = self
            .post(&format!("/export/{project_id}/webtoon"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    /// Return the response unchanged on 2xx, otherwise an
    /// [`ApiError::Status`] with the body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), body = %body, "Backend request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
