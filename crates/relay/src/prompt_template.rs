use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

/// The persona used when no template file is configured
const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    // relative names that don't resolve are looked up among the bundled prompts
    let file_path = if !template_path.exists() {
        prompts_dir().join(template_path)
    } else {
        template_path
    };

    let template_content = fs::read_to_string(file_path)
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

#[derive(Serialize)]
struct SystemContext<'a> {
    tools: &'a [Tool],
}

/// Render the System message for a query, from `template_file` or the built-in persona
pub fn system_prompt(
    template_file: Option<&PathBuf>,
    tools: &[Tool],
) -> Result<String, TeraError> {
    let context = SystemContext { tools };
    let rendered = match template_file {
        Some(path) => load_prompt_file(path.clone(), &context)?,
        None => load_prompt(SYSTEM_TEMPLATE, &context)?,
    };
    Ok(rendered.trim().to_string())
}
