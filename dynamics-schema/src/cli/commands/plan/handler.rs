//! Offline plan command: load, resolve and print derived names

use anyhow::{Context, Result};
use colored::*;
use serde_json::{Value, json};

use super::PlanCommands;
use crate::cli::commands::{OutputFormat, load_config, read_definitions};
use crate::cli::output;
use crate::schema::resolve::{AttributeDecl, ResolvedEntity, resolve_all};

pub fn handle_plan_command(args: PlanCommands) -> Result<bool> {
    if args.naming.no_color {
        colored::control::set_override(false);
    }

    let config = load_config(&args.naming, None, None)?;
    let definitions = read_definitions(&args.file)?;
    let ctx = config.naming_context();

    let resolved = resolve_all(&definitions, &ctx, config.sync.type_policy)
        .context("Failed to resolve schema description")?;

    let unmapped = resolved
        .iter()
        .flat_map(|r| &r.attributes)
        .filter(|a| matches!(a, AttributeDecl::Unmapped { .. }))
        .count();

    match args.output {
        OutputFormat::Text => {
            println!(
                "{} entities from {} (prefix '{}', locale {})",
                resolved.len().to_string().bold(),
                args.file.display().to_string().cyan(),
                ctx.prefix,
                ctx.locale
            );
            output::print_resolved(&resolved);
            if unmapped > 0 {
                println!();
                println!(
                    "{}",
                    format!("{} members have unknown types", unmapped).red()
                );
            }
        }
        OutputFormat::Json => {
            let value = Value::Array(resolved.iter().map(resolved_json).collect());
            let json = serde_json::to_string_pretty(&value).context("Failed to format JSON output")?;
            println!("{}", json);
        }
    }

    Ok(unmapped == 0)
}

fn resolved_json(resolved: &ResolvedEntity) -> Value {
    let attributes: Vec<Value> = resolved
        .attributes
        .iter()
        .map(|attribute| match attribute {
            AttributeDecl::Mapped(spec) => json!({
                "schema_name": spec.schema_name,
                "type": spec.kind.tag(),
            }),
            AttributeDecl::Unmapped { schema_name, error } => json!({
                "schema_name": schema_name,
                "error": error.to_string(),
            }),
        })
        .collect();

    json!({
        "name": resolved.name,
        "entity": resolved.entity,
        "attributes": attributes,
        "key": resolved.key,
        "many_to_one": resolved.many_to_one,
        "many_to_many": resolved.many_to_many,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NamingContext, TypePolicy, load};

    #[test]
    fn test_resolved_json() {
        let definitions = load(
            r#"[{ "Name": "Country", "PrimaryKey": "ISO", "Members": { "ID": "String", "ISO": "String", "Photo": "Picture" } }]"#,
        )
        .unwrap();
        let resolved = resolve_all(&definitions, &NamingContext::default(), TypePolicy::Lenient).unwrap();

        let value = resolved_json(&resolved[0]);
        assert_eq!(value["entity"]["schema_name"], "oap_country");
        assert_eq!(value["attributes"][0]["type"], "string");
        assert!(value["attributes"][1]["error"].as_str().unwrap().contains("Picture"));
        assert_eq!(value["key"]["key_attributes"][0], "oap_iso");
    }
}
