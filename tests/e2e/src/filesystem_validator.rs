use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

/// Temp files are removed by a task that runs after the response is sent,
/// so give it a moment before failing
pub async fn validate_scratch_empty(temp_dir: &Path) -> Result<()> {
    let mut leftover = Vec::new();
    for _ in 0..50 {
        leftover = list_files(temp_dir)?;
        if leftover.is_empty() {
            println!("  ✓ Scratch directory is empty");
            return Ok(());
        }
        sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("Scratch directory {:?} still holds {:?}", temp_dir, leftover);
}

pub fn validate_stored_file(
    data_dir: &Path,
    category: &str,
    stored_name: &str,
    expected_size: u64,
) -> Result<()> {
    let file_path = data_dir.join(category).join(stored_name);
    let metadata = fs::metadata(&file_path)
        .with_context(|| format!("Stored file does not exist: {:?}", file_path))?;
    if metadata.len() != expected_size {
        anyhow::bail!(
            "Stored file {:?} has {} bytes, expected {}",
            file_path,
            metadata.len(),
            expected_size
        );
    }

    let record_path = data_dir
        .join(category)
        .join(format!("{}.meta.json", stored_name));
    let record: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&record_path)
            .with_context(|| format!("Failed to read metadata from {:?}", record_path))?,
    )
    .context("Failed to parse metadata JSON")?;
    if record.get("size").and_then(|v| v.as_u64()) != Some(expected_size) {
        anyhow::bail!("Metadata size mismatch in {:?}: {}", record_path, record);
    }

    println!("  ✓ Stored {}/{} ({} bytes)", category, stored_name, expected_size);
    Ok(())
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
