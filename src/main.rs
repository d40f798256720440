use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use price_trends::{
    project_transactions, ColumnType, CsvSource, PipelineConfig, PlotDataProvider, SchemaCache,
    SpecialColumn, TabularDataset,
};

/// Print quantile, grouping and trend-line results for a transaction CSV as
/// JSON lines.
#[derive(Parser, Debug)]
#[command(name = "price-trends", version)]
struct Cli {
    /// CSV file, one transaction per row.
    input: PathBuf,

    /// Header of the transaction date column.
    #[arg(long)]
    date: String,

    /// Header of the price-per-unit column.
    #[arg(long)]
    price: String,

    /// Header of the column to group prices by. Overrides the configured
    /// `grouping_column`.
    #[arg(long)]
    group: Option<String>,

    /// Only load these columns (the date, price and group columns are always kept).
    #[arg(long, value_delimiter = ',')]
    keep: Vec<String>,

    /// JSON pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the loaded schema description here.
    #[arg(long)]
    schema_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let name = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string();
    let source = CsvSource::from_path(&cli.input, &config).context("opening CSV")?;
    let mut dataset = TabularDataset::new(&name, source).with_sample_size(config.sample_size);
    dataset.initialize().context("analysing CSV")?;

    let mut sample = dataset.retrieve_sample_data();
    dataset.update_sample_data_strings(&mut sample);
    for row in &sample {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        debug!("sample: {}", cells.join(" | "));
    }

    let date_column = column_index(&dataset, &cli.date)?;
    let price_column = column_index(&dataset, &cli.price)?;
    dataset.set_special_column(SpecialColumn::TransactionDate, date_column)?;
    dataset.set_special_column(SpecialColumn::PricePerUnit, price_column)?;

    // Resolved by name before compaction shifts the indices.
    let group_name = config.grouping_column_name(&dataset, cli.group.as_deref())?;

    if !cli.keep.is_empty() {
        let mask = dataset
            .columns()
            .iter()
            .map(|c| {
                cli.keep.contains(&c.name)
                    || c.name == cli.date
                    || c.name == cli.price
                    || group_name.as_ref() == Some(&c.name)
            })
            .collect();
        dataset.set_active_columns(mask)?;
    }
    dataset.load_data().context("loading CSV rows")?;

    // Indices may have shifted during compaction.
    let group_column = group_name
        .as_deref()
        .map(|group| column_index(&dataset, group))
        .transpose()?;
    let grouping_type = match group_column {
        Some(column) => dataset.column_format(column)?,
        None => ColumnType::String,
    };

    let records =
        project_transactions(&dataset, group_column).context("projecting transactions")?;
    info!("{} transactions ready for plotting", records.len());

    let mut provider = PlotDataProvider::new(group_column).with_epoch(config.epoch);
    let events = provider.subscribe_channel();
    provider.recompute(records, grouping_type);

    for event in events.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
    }

    if let Some(path) = &cli.schema_out {
        let json = SchemaCache::from_dataset(&dataset).to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing schema to {}", path.display()))?;
        info!("Schema written to {}", path.display());
    }
    Ok(())
}

fn column_index(dataset: &TabularDataset, name: &str) -> Result<usize> {
    dataset
        .columns()
        .iter()
        .position(|c| c.name == name)
        .with_context(|| format!("no column named '{name}'"))
}
