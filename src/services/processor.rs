use crate::config::AppConfig;
use crate::services::error::ExchangeError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key files the external tool expects next to each other in the key
/// directory. Only the keystore itself is mandatory enough to warn about.
const KEY_FILES: &[&str] = &["transferencia.jks"];

/// Name fragments that mark a file as transformer output during the
/// fallback scan.
const OUTPUT_MARKERS: &[&str] = &[".cif", ".enc", "_cifrado"];

/// Seam to the external encryption tool.
///
/// The tool reads `<base_name><extension>` from `work_dir` and writes its
/// output somewhere discoverable (see `locate_output`); failure is signaled
/// by a non-zero exit. That contract is assumed, not guaranteed, which is
/// why discovery is heuristic.
#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        extension: &str,
        base_name: &str,
        key_dir: &Path,
        work_dir: &Path,
    ) -> Result<(), ExchangeError>;
}

/// Invokes the configured external command as
/// `<command> <extension> <base_name> <key_dir>` with the workspace as its
/// working directory. The invocation is treated as atomic: no retry, no
/// cooperative cancellation.
pub struct CommandTransformer {
    command: String,
}

impl CommandTransformer {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl Transformer for CommandTransformer {
    async fn transform(
        &self,
        extension: &str,
        base_name: &str,
        key_dir: &Path,
        work_dir: &Path,
    ) -> Result<(), ExchangeError> {
        tracing::info!(
            "invoking {} for {}{} (keys: {})",
            self.command,
            base_name,
            extension,
            key_dir.display()
        );

        let output = tokio::process::Command::new(&self.command)
            .arg(extension)
            .arg(base_name)
            .arg(key_dir)
            .current_dir(work_dir)
            .output()
            .await
            .map_err(|e| {
                ExchangeError::Processing(format!("failed to launch {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("{} failed: {}", self.command, stderr.trim());
            return Err(ExchangeError::Processing(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Stand-in transformer for development and tests: copies the input to
/// `<base_name>.cif` without touching its contents.
pub struct PassthroughTransformer;

#[async_trait::async_trait]
impl Transformer for PassthroughTransformer {
    async fn transform(
        &self,
        extension: &str,
        base_name: &str,
        _key_dir: &Path,
        work_dir: &Path,
    ) -> Result<(), ExchangeError> {
        let input = work_dir.join(format!("{}{}", base_name, extension));
        let output = work_dir.join(format!("{}.cif", base_name));
        tokio::fs::copy(&input, &output).await?;
        Ok(())
    }
}

/// Picks the transformer implementation for the current configuration.
pub fn setup_transformer(config: &AppConfig) -> Arc<dyn Transformer> {
    match &config.transformer_command {
        Some(command) if !command.is_empty() => {
            tracing::info!("🔐 External transformer: {}", command);
            Arc::new(CommandTransformer::new(command.clone()))
        }
        _ => {
            tracing::warn!("⚠️  No transformer command configured, using passthrough");
            Arc::new(PassthroughTransformer)
        }
    }
}

/// The output names the tool is known to produce, in precedence order.
/// The first existing candidate wins; this is a tie-break, not a
/// best-match search.
pub fn candidate_names(base_name: &str, extension: &str) -> [String; 6] {
    [
        format!("{base_name}.cif"),
        format!("{base_name}{extension}.cif"),
        format!("{base_name}.enc"),
        format!("{base_name}{extension}.enc"),
        format!("{base_name}_cifrado{extension}"),
        format!("{base_name}.cifrado"),
    ]
}

/// Pure discovery over a directory listing: the candidate list first, then
/// any unexplained file containing the base name (marked names preferred).
pub fn discover_output<'a>(
    listing: &'a [String],
    base_name: &str,
    extension: &str,
) -> Option<&'a str> {
    for candidate in candidate_names(base_name, extension) {
        if let Some(found) = listing.iter().find(|name| **name == candidate) {
            return Some(found.as_str());
        }
    }

    let input_name = format!("{base_name}{extension}");
    let unexplained =
        |name: &&str| name.contains(base_name) && **name != input_name;

    listing
        .iter()
        .map(String::as_str)
        .filter(unexplained)
        .find(|name| OUTPUT_MARKERS.iter().any(|marker| name.contains(marker)))
        .or_else(|| listing.iter().map(String::as_str).find(unexplained))
}

async fn list_dir(dir: &Path) -> Result<Vec<String>, ExchangeError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Finds the file the tool produced. The workspace is scanned first; if a
/// tool working directory is configured, the fallback scan runs there too
/// (older tool builds write next to wherever the process happened to be).
pub async fn locate_output(
    work_dir: &Path,
    aux_dir: Option<&Path>,
    base_name: &str,
    extension: &str,
) -> Result<PathBuf, ExchangeError> {
    let listing = list_dir(work_dir).await?;
    if let Some(name) = discover_output(&listing, base_name, extension) {
        tracing::info!("encrypted output found: {}", name);
        return Ok(work_dir.join(name));
    }

    if let Some(aux) = aux_dir {
        let aux_listing = list_dir(aux).await.unwrap_or_default();
        if let Some(name) = discover_output(&aux_listing, base_name, extension) {
            tracing::info!("encrypted output found in tool directory: {}", name);
            return Ok(aux.join(name));
        }
    }

    Err(ExchangeError::OutputNotFound { listing })
}

/// Resolves the directory holding the tool's key material.
///
/// The configured directory is used as-is when it exists. Otherwise the
/// known key files are materialized into it from the bundle directory,
/// copy-on-demand; a key file missing from the bundle is logged and
/// skipped, but a location that cannot be resolved at all is fatal to the
/// request.
pub async fn resolve_key_dir(config: &AppConfig) -> Result<PathBuf, ExchangeError> {
    if config.key_dir.is_dir() {
        for name in KEY_FILES {
            if !config.key_dir.join(name).exists() {
                tracing::warn!("key file not found: {}", name);
            }
        }
        return Ok(config.key_dir.clone());
    }

    let Some(bundle) = config.key_bundle_dir.as_deref() else {
        return Err(ExchangeError::Configuration(format!(
            "key directory {} does not exist and no key bundle is configured",
            config.key_dir.display()
        )));
    };

    if !bundle.is_dir() {
        return Err(ExchangeError::Configuration(format!(
            "key bundle directory {} does not exist",
            bundle.display()
        )));
    }

    tokio::fs::create_dir_all(&config.key_dir).await?;
    for name in KEY_FILES {
        match tokio::fs::copy(bundle.join(name), config.key_dir.join(name)).await {
            Ok(_) => tracing::info!("materialized key file: {}", name),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("key file not present in bundle: {}", name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(config.key_dir.clone())
}
