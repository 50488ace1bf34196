use super::{json_pretty, TermConsole, EXIT_SUCCESS};
use netfence_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, file: Option<&Path>, json: bool) -> Result<u8, String> {
    let path = file.unwrap_or(engine.settings().import.path.as_path());
    let console = TermConsole::new(json);
    let imported = engine
        .import(Some(path), &console)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "path": path.display().to_string(),
            "imported": !imported.is_empty(),
            "document": imported,
        });
        println!("{}", json_pretty(&payload)?);
    } else if imported.is_empty() {
        println!("nothing imported from {}", path.display());
    }
    Ok(EXIT_SUCCESS)
}
