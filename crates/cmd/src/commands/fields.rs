use super::{connect, load_config};
use anyhow::Result;
use std::path::Path;
use tabvu::FieldKind;

pub async fn fields_command(config_path: &Path, datasource_luid: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    let fields = client.read_metadata(datasource_luid).await?;

    let dimensions: Vec<_> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Dimension)
        .collect();
    let measures: Vec<_> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Measure)
        .collect();

    println!("Dimensions ({}):", dimensions.len());
    for field in dimensions {
        println!("  {:?}  {}", field.data_type, field.name);
    }
    println!("Measures ({}):", measures.len());
    for field in measures {
        println!("  {:?}  {}", field.data_type, field.name);
    }
    Ok(())
}
