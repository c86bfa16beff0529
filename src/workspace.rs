//! Per-user workspaces and input staging
//!
//! Each user gets a folder under `<static_root>/user_data/` named after the
//! local part of their email. The three PRMS inputs (control, data and
//! parameter file) are staged there, either copied from the default model
//! run or downloaded from caller-supplied URLs. Staging is not atomic: a
//! failure part way leaves whatever was already written.

use crate::config::AppConfig;
use crate::errors::{PrmsError, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Paths of the staged PRMS inputs inside a user's folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedInputs {
    pub control: PathBuf,
    pub data: PathBuf,
    pub param: PathBuf,
}

impl StagedInputs {
    pub fn in_folder(config: &AppConfig, folder: &Path) -> Self {
        Self {
            control: join_name(folder, &config.temp_control),
            data: join_name(folder, &config.temp_data),
            param: join_name(folder, &config.temp_param),
        }
    }

    fn paths(&self) -> [&Path; 3] {
        [&self.control, &self.data, &self.param]
    }
}

/// Download locations of the three inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputUrls {
    pub control_url: String,
    pub data_url: String,
    pub param_url: String,
}

// Configured names may carry a leading '/'; they are always relative to the folder.
fn join_name(folder: &Path, name: &str) -> PathBuf {
    folder.join(name.trim_start_matches('/'))
}

/// Local part of an email address, usable as a single path component.
pub fn user_local_part(email: &str) -> Result<&str> {
    let invalid = |reason: &str| PrmsError::InvalidUser {
        email: email.to_string(),
        reason: reason.to_string(),
    };

    let local = email.split('@').next().unwrap_or_default().trim();

    if local.is_empty() {
        return Err(invalid("empty local part"));
    }
    if local.contains(['/', '\\']) || local == "." || local == ".." {
        return Err(invalid("local part is not a valid folder name"));
    }

    Ok(local)
}

/// Workspace folder of a user: `<static_root>/user_data/<local-part>`.
///
/// Two emails sharing a local part share a folder.
pub fn find_user_folder(static_root: &Path, email: &str) -> Result<PathBuf> {
    Ok(static_root.join("user_data").join(user_local_part(email)?))
}

/// Resolves a user's folder and the staged input paths inside it, creating the folder if needed.
pub fn prepare_user_folder(config: &AppConfig, email: &str) -> Result<(PathBuf, StagedInputs)> {
    let folder = find_user_folder(&config.static_root, email)?;

    if !folder.exists() {
        fs::create_dir_all(&folder)?;
        tracing::info!(folder = %folder.display(), "Created user folder");
    }

    let staged = StagedInputs::in_folder(config, &folder);
    Ok((folder, staged))
}

/// Staged input paths of a user without touching the filesystem.
pub fn staged_inputs(config: &AppConfig, email: &str) -> Result<StagedInputs> {
    let folder = find_user_folder(&config.static_root, email)?;
    Ok(StagedInputs::in_folder(config, &folder))
}

/// Removes previously staged inputs that exist.
pub fn clear_staged_inputs(staged: &StagedInputs) -> Result<()> {
    for path in staged.paths() {
        if path.is_file() {
            fs::remove_file(path)?;
            tracing::debug!(path = %path.display(), "Removed stale input");
        }
    }
    Ok(())
}

/// Copies the default control, data and parameter files into the user's folder.
pub fn use_default_model_run(config: &AppConfig, email: &str) -> Result<StagedInputs> {
    let (_, staged) = prepare_user_folder(config, email)?;
    clear_staged_inputs(&staged)?;

    let defaults = config.default_data_dir();
    fs::copy(join_name(&defaults, &config.default_control), &staged.control)?;
    fs::copy(join_name(&defaults, &config.default_data), &staged.data)?;
    fs::copy(join_name(&defaults, &config.default_param), &staged.param)?;

    tracing::info!(user = email, "Staged default model run inputs");
    Ok(staged)
}

/// Downloads the three inputs into the user's folder, replacing earlier copies.
pub async fn download_prms_inputs(
    config: &AppConfig,
    email: &str,
    urls: &InputUrls,
) -> Result<StagedInputs> {
    let folder = find_user_folder(&config.static_root, email)?;
    if !tokio::fs::try_exists(&folder).await? {
        tokio::fs::create_dir_all(&folder).await?;
        tracing::info!(folder = %folder.display(), "Created user folder");
    }

    let staged = StagedInputs::in_folder(config, &folder);
    for path in staged.paths() {
        let is_file = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if is_file {
            tokio::fs::remove_file(path).await?;
            tracing::debug!(path = %path.display(), "Removed stale input");
        }
    }

    let client = Client::builder().build()?;
    download_file(&client, &urls.control_url, &staged.control).await?;
    download_file(&client, &urls.data_url, &staged.data).await?;
    download_file(&client, &urls.param_url, &staged.param).await?;

    tracing::debug!(user = email, "Finished downloading three input files");
    Ok(staged)
}

/// Streams the body of `url` into `dest`.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(PrmsError::UpstreamStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::debug!(url, path = %dest.display(), bytes = written, "Downloaded file");
    Ok(written)
}
