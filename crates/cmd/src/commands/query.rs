use super::{confirm, connect, load_config};
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use std::path::Path;
use tabvu::{
    AggFn, AggregatedField, FieldKind, FieldRef, Filter, QueryDefinition, QueryStore, SaveOutcome,
};

pub async fn save_command(
    config_path: &Path,
    name: &str,
    datasource_luid: &str,
    dimensions: &[String],
    measures: &[String],
    filters: &[String],
    overwrite: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    // resolve captions against live metadata so typos and type mistakes
    // surface here, not at the first scheduled run
    let fields = client.read_metadata(datasource_luid).await?;
    let lookup = |caption: &str| -> Result<&FieldRef> {
        fields
            .iter()
            .find(|f| f.name == caption)
            .ok_or_else(|| anyhow!("datasource has no field named '{caption}'"))
    };

    let mut resolved_dimensions = Vec::with_capacity(dimensions.len());
    for caption in dimensions {
        let field = lookup(caption)?;
        if field.kind != FieldKind::Dimension {
            bail!("'{caption}' is a measure; pass it with --measure and an aggregation");
        }
        resolved_dimensions.push(field.clone());
    }

    let mut resolved_measures = Vec::with_capacity(measures.len());
    for raw in measures {
        let (caption, function) = raw
            .rsplit_once('=')
            .ok_or_else(|| anyhow!("measures look like CAPTION=FUNCTION, got '{raw}'"))?;
        let function = AggFn::parse(function)
            .ok_or_else(|| anyhow!("unknown aggregation '{function}' in '{raw}'"))?;
        let field = lookup(caption)?;
        if field.kind != FieldKind::Measure {
            bail!("'{caption}' is a dimension and cannot be aggregated");
        }
        resolved_measures.push(AggregatedField {
            field: field.clone(),
            function,
        });
    }

    let mut resolved_filters = Vec::with_capacity(filters.len());
    for raw in filters {
        let value =
            serde_json::from_str(raw).with_context(|| format!("filter '{raw}' is not JSON"))?;
        let filter = Filter::from_wire(&value)
            .with_context(|| format!("filter '{raw}' is not a known filter shape"))?;
        resolved_filters.push(filter);
    }

    let datasource_name = client
        .list_datasources()
        .await?
        .into_iter()
        .find(|d| d.luid == datasource_luid)
        .map(|d| d.name)
        .unwrap_or_else(|| datasource_luid.to_string());

    let definition = QueryDefinition {
        name: name.to_string(),
        datasource_luid: datasource_luid.to_string(),
        datasource_name,
        dimensions: resolved_dimensions,
        measures: resolved_measures,
        filters: resolved_filters,
        saved_at: Utc::now(),
    };

    let mut store = QueryStore::open(&config.data_dir)?;
    match store.save(definition.clone(), overwrite)? {
        SaveOutcome::Added => println!("Saved query '{name}'"),
        SaveOutcome::Replaced => println!("Updated query '{name}'"),
        SaveOutcome::NeedsConfirmation => {
            if confirm(&format!("A query named '{name}' already exists. Overwrite it?"))? {
                store.save(definition, true)?;
                println!("Updated query '{name}'");
            } else {
                println!("Left the existing query untouched.");
            }
        }
    }
    Ok(())
}

pub fn list_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = QueryStore::open(&config.data_dir)?;

    if store.queries().is_empty() {
        println!("No saved queries.");
        return Ok(());
    }

    let mut queries: Vec<_> = store.queries().to_vec();
    queries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    for query in &queries {
        println!(
            "{} ({})  saved {}",
            query.name,
            query.datasource_name,
            query.saved_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn show_command(config_path: &Path, name: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let store = QueryStore::open(&config.data_dir)?;
    let query = store
        .get(name)
        .ok_or_else(|| anyhow!("no saved query named '{name}'"))?;
    println!("{}", serde_json::to_string_pretty(query)?);
    Ok(())
}

pub fn delete_command(config_path: &Path, name: &str, yes: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = QueryStore::open(&config.data_dir)?;

    if store.get(name).is_none() {
        bail!("no saved query named '{name}'");
    }
    if !yes && !confirm(&format!("Delete the saved query '{name}'?"))? {
        println!("Nothing deleted.");
        return Ok(());
    }
    store.remove(name)?;
    println!("Deleted query '{name}'");
    Ok(())
}
