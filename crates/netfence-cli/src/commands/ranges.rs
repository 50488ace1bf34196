use super::{json_pretty, EXIT_SUCCESS};
use netfence_core::Engine;
use netfence_schema::PoolRanges;

pub struct RangeArgs {
    pub public: Option<String>,
    pub internal: Option<String>,
    pub shared: Option<String>,
    pub clear: bool,
}

/// Merge the given values over the stored ranges. An empty value removes
/// that range.
fn merge(current: PoolRanges, args: RangeArgs) -> PoolRanges {
    fn pick(given: Option<String>, current: Option<String>) -> Option<String> {
        match given {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_owned()),
            None => current,
        }
    }
    PoolRanges {
        public: pick(args.public, current.public),
        internal: pick(args.internal, current.internal),
        shared: pick(args.shared, current.shared),
    }
}

pub fn run(engine: &Engine, args: RangeArgs, json: bool) -> Result<u8, String> {
    if !args.clear && args.public.is_none() && args.internal.is_none() && args.shared.is_none() {
        return Err("nothing to set: pass --public, --internal, --shared or --clear".to_owned());
    }

    let ranges = if args.clear {
        PoolRanges::default()
    } else {
        let current = engine.load_config().map_err(|e| e.to_string())?.pool_ranges;
        merge(current, args)
    };
    engine.set_ranges(&ranges).map_err(|e| e.to_string())?;

    let resolved = ranges.resolve(true);
    if json {
        let payload = serde_json::json!({
            "ranges": ranges,
            "resolved": resolved,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "public:   {}",
            resolved.public.as_deref().unwrap_or("(none)")
        );
        println!(
            "internal: {}",
            resolved.internal.as_deref().unwrap_or("(none)")
        );
    }
    Ok(EXIT_SUCCESS)
}
