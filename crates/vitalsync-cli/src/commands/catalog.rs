use vitalsync_core::{MetricCatalog, MetricCategory, MetricDefinition};

pub fn run(category: Option<&str>) -> anyhow::Result<()> {
    let catalog = MetricCatalog::builtin();

    let categories: Vec<MetricCategory> = match category {
        Some(label) => {
            let Some(cat) = MetricCategory::parse(label) else {
                let known: Vec<String> =
                    MetricCategory::ALL.iter().map(|c| c.to_string()).collect();
                anyhow::bail!(
                    "unknown category '{label}' (expected one of: {})",
                    known.join(", ")
                );
            };
            vec![cat]
        }
        None => MetricCategory::ALL.to_vec(),
    };

    println!("{} metrics in the catalog", catalog.len());
    for cat in categories {
        let defs = catalog.by_category(cat);
        if defs.is_empty() {
            continue;
        }
        println!("\n{cat} ({})", defs.len());
        for def in defs {
            println!(
                "  {:<34} {:<14} {:<8} {}",
                def.id,
                def.unit,
                def.aggregation.to_string(),
                flags(def)
            );
        }
    }

    let cloud: Vec<&str> = catalog.cloud_eligible().iter().map(|d| d.id).collect();
    println!("\nCloud fallback: {}", cloud.join(", "));
    Ok(())
}

/// Which sources may serve a metric, as a compact tag list.
fn flags(def: &MetricDefinition) -> String {
    let mut tags = Vec::new();
    if def.native_scalar {
        tags.push("daily");
    }
    if def.native_range {
        tags.push("history");
    }
    if def.cloud_fallback {
        tags.push("cloud");
    }
    tags.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_for_builtin_kinds() {
        let catalog = MetricCatalog::builtin();
        assert_eq!(flags(catalog.definition_of("steps").unwrap()), "daily,history");
        assert_eq!(flags(catalog.definition_of("body_mass").unwrap()), "daily,history,cloud");
        assert_eq!(flags(catalog.definition_of("vo2_max").unwrap()), "history");
    }

    #[test]
    fn test_unknown_category_is_error() {
        assert!(run(Some("astrology")).is_err());
        assert!(run(Some("Heart")).is_ok());
    }
}
