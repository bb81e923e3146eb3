//! A stand-in for `$EDITOR`.
//!
//! `cargo crev review` writes a template, runs `$EDITOR <file>` and reads
//! the file back once the editor exits. The shim copies the prepared draft
//! over that file, waits, then touches it so the modification is seen.

use std::path::Path;

use tracing::debug;

use crate::error::{CrevError, Result};

/// Render the shim script for `draft`
pub fn render_shim(draft: &Path, delay_secs: u64) -> String {
    format!(
        "#!/bin/sh\n\
         cat {draft} > \"${{1?}}\"\n\
         sleep {delay}\n\
         touch \"${{1?}}\"\n",
        draft = shell_quote(&draft.to_string_lossy()),
        delay = delay_secs,
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Write the shim to `path` and make it executable
pub async fn install_shim(path: &Path, draft: &Path, delay_secs: u64) -> Result<()> {
    tokio::fs::write(path, render_shim(draft, delay_secs))
        .await
        .map_err(|e| CrevError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| CrevError::io(path, e))?;
    }

    debug!(path = %path.display(), "Installed editor shim");

    Ok(())
}
