use super::{json_pretty, EXIT_SUCCESS};
use console::Style;
use netfence_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let config = engine.load_config().map_err(|e| e.to_string())?;
    let resolved = config.resolved_ranges();

    if json {
        let payload = serde_json::json!({
            "model": engine.settings().fabric.model,
            "config": config,
            "resolved_ranges": resolved,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    let bold = Style::new().bold();
    let enabled = if config.enabled {
        Style::new().green().apply_to("enabled")
    } else {
        Style::new().yellow().apply_to("disabled")
    };
    println!("{} {}", bold.apply_to("model:"), engine.settings().fabric.model);
    println!("{} {enabled}", bold.apply_to("isolation:"));

    println!("{}", bold.apply_to("spaces:"));
    if config.spaces.is_empty() {
        println!("  (none)");
    }
    for space in &config.spaces {
        if space.spec.subnets.is_empty() {
            println!("  {:<12} (no subnets, left unchanged)", space.name);
        } else {
            println!("  {:<12} {}", space.name, space.spec.subnets.join(", "));
        }
    }

    println!("{}", bold.apply_to("pools:"));
    let names = &engine.settings().names;
    for role in netfence_schema::PoolRole::ALL {
        println!(
            "  {:<8} {:<24} {}",
            role.to_string(),
            names.pool(role).as_str(),
            resolved.get(role).unwrap_or("(none)")
        );
    }
    Ok(EXIT_SUCCESS)
}
