//! Assembler: concatenates completed parts into the final output file once
//! every worker has joined and the orchestrator has decided the transfer is
//! complete.

use crate::session::Session;
use crate::state_store;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Concatenates `session.parts` (in index order) into part 0's file, renames
/// it to `session.suggested_file_name`, then deletes the consumed part files
/// and the state sidecar.
///
/// On any I/O error during concatenation the error is surfaced and nothing
/// else is deleted, leaving the partial state in place for a future resume.
pub fn assemble(session: &Session, dir: &Path) -> Result<()> {
    let parts: Vec<_> = session.parts.iter().filter(|p| !p.skip).collect();
    let Some(first) = parts.first() else {
        anyhow::bail!("no parts to assemble");
    };

    let first_path = dir.join(&first.file_name);
    {
        let mut out = OpenOptions::new()
            .append(true)
            .open(&first_path)
            .with_context(|| format!("opening {}", first_path.display()))?;

        for part in &parts[1..] {
            let part_path = dir.join(&part.file_name);
            let mut input = File::open(&part_path)
                .with_context(|| format!("opening {}", part_path.display()))?;
            io::copy(&mut input, &mut out)
                .with_context(|| format!("appending {}", part_path.display()))?;
        }
    }

    let final_path = dir.join(&session.suggested_file_name);
    fs::rename(&first_path, &final_path)
        .with_context(|| format!("renaming {} to {}", first_path.display(), final_path.display()))?;

    for part in &parts[1..] {
        let _ = fs::remove_file(dir.join(&part.file_name));
    }
    let _ = state_store::delete(&dir.join(session.sidecar_path()));

    Ok(())
}
