use crate::config::AppConfig;
use crate::services::error::ExchangeError;
use crate::services::processor::{self, Transformer};
use crate::services::staging::StagingWorkspace;
use crate::services::token_store::{FileToken, TokenStore};
use crate::utils::validation::{split_name, validate_submission};
use std::sync::Arc;

/// Orchestrates one exchange: stage the input, run the external tool,
/// discover and read its output, and mint a download token for the result.
pub struct ExchangeService {
    tokens: Arc<TokenStore>,
    transformer: Arc<dyn Transformer>,
    config: AppConfig,
}

impl ExchangeService {
    pub fn new(
        tokens: Arc<TokenStore>,
        transformer: Arc<dyn Transformer>,
        config: AppConfig,
    ) -> Self {
        Self {
            tokens,
            transformer,
            config,
        }
    }

    /// Runs the full pipeline for one submitted file.
    ///
    /// Validation happens before any filesystem or subprocess work. The
    /// staging workspace is released on every exit path, including early
    /// errors and dropped futures, and the token store is only touched
    /// after the transformer has completed; a failed request never issues
    /// a token.
    pub async fn process(
        &self,
        data: &[u8],
        display_name: &str,
    ) -> Result<FileToken, ExchangeError> {
        if data.is_empty() {
            return Err(ExchangeError::InvalidInput("file is empty".to_string()));
        }
        if data.len() > self.config.max_file_size {
            return Err(ExchangeError::PayloadTooLarge {
                size: data.len(),
                limit: self.config.max_file_size,
            });
        }
        let file_name = validate_submission(display_name, &self.config.accepted_extension)?;
        let (base_name, extension) = split_name(&file_name);

        let mut workspace = StagingWorkspace::create(&self.config.staging_root)?;
        workspace.stage(data, &file_name).await?;
        if let Some(tool_dir) = &self.config.tool_work_dir {
            workspace.stage_copy(data, tool_dir, &file_name).await?;
        }

        let key_dir = processor::resolve_key_dir(&self.config).await?;
        self.transformer
            .transform(&extension, &base_name, &key_dir, workspace.path())
            .await?;

        let output_path = processor::locate_output(
            workspace.path(),
            self.config.tool_work_dir.as_deref(),
            &base_name,
            &extension,
        )
        .await?;
        workspace.track(output_path.clone());
        let output = tokio::fs::read(&output_path).await?;
        tracing::info!(
            "processed {} -> {} ({} bytes)",
            file_name,
            output_path.display(),
            output.len()
        );

        self.tokens.issue(&output, &file_name).await
    }

    /// Fetch-by-token for download. Unknown and expired tokens are the same
    /// `NotFound`.
    pub async fn redeem(&self, token: &str) -> Result<(Vec<u8>, String), ExchangeError> {
        let entry = self
            .tokens
            .lookup(token)
            .await
            .ok_or(ExchangeError::NotFound)?;
        let data = self.tokens.read(&entry).await?;
        Ok((data, entry.original_name))
    }

    pub async fn describe(&self, token: &str) -> Result<FileToken, ExchangeError> {
        self.tokens
            .describe(token)
            .await
            .ok_or(ExchangeError::NotFound)
    }

    pub async fn revoke(&self, token: &str) {
        self.tokens.revoke(token).await;
    }
}
