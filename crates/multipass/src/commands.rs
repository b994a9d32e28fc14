use std::path::Path;

use anyhow::{bail, Context, Result};
use project::{Project, TextureAsset, TextureFetcher, FINAL_PASS_ID};
use renderer::{assemble_fragment, validate_fragment};
use tracing::debug;

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    Project::default()
        .save(path)
        .with_context(|| format!("failed to write project to {}", path.display()))?;
    println!("Wrote default project to {}", path.display());
    Ok(())
}

/// Validates the record and compile-checks every pass; fails if any pass does.
pub fn check(path: &Path) -> Result<()> {
    let project = load(path)?;
    let mut failures = 0;
    for id in pass_order(&project) {
        let assembled = assemble_fragment(project.source(id));
        match validate_fragment(&assembled) {
            Ok(()) => println!("  ok      {id}"),
            Err(err) => {
                failures += 1;
                println!("  failed  {id}\n{err}");
            }
        }
    }
    for (slot, asset) in project.textures.iter().enumerate() {
        match asset.bytes() {
            Ok(bytes) => println!("  texture {slot}: {} ({} bytes)", asset.name, bytes.len()),
            Err(err) => {
                failures += 1;
                println!("  texture {slot}: {} is unreadable: {err}", asset.name);
            }
        }
    }
    if failures > 0 {
        bail!("{failures} problem(s) found in {}", path.display());
    }
    println!("{} is ready to run", path.display());
    Ok(())
}

pub fn add_texture(path: &Path, source: &str) -> Result<()> {
    let mut project = load(path)?;
    let asset = if source.starts_with("http://") || source.starts_with("https://") {
        TextureFetcher::new()?
            .fetch(source)
            .with_context(|| format!("failed to fetch texture from {source}"))?
    } else {
        TextureAsset::from_file(Path::new(source))
            .with_context(|| format!("failed to read texture {source}"))?
    };
    debug!(id = %asset.id, name = %asset.name, "embedding texture");
    let name = asset.name.clone();
    let slot = project.push_texture(asset)?;
    save(&project, path)?;
    println!("Added {name} as iTexChannel{slot}");
    Ok(())
}

pub fn add_buffer(path: &Path) -> Result<()> {
    let mut project = load(path)?;
    let id = project.add_buffer()?;
    save(&project, path)?;
    println!("Added {id}");
    Ok(())
}

pub fn remove_buffer(path: &Path) -> Result<()> {
    let mut project = load(path)?;
    let id = project.remove_last_buffer()?;
    save(&project, path)?;
    println!("Removed {id}");
    Ok(())
}

fn pass_order(project: &Project) -> impl Iterator<Item = &str> {
    project
        .buffers
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(FINAL_PASS_ID))
}

fn load(path: &Path) -> Result<Project> {
    Project::load(path).with_context(|| format!("failed to load project {}", path.display()))
}

fn save(project: &Project, path: &Path) -> Result<()> {
    project
        .save(path)
        .with_context(|| format!("failed to save project {}", path.display()))
}
