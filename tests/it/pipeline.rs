use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use price_trends::{
    project_transactions, ColumnType, CsvSource, GroupingKey, PipelineConfig, PlotDataProvider,
    PlotEvent, RegressionLine, SchemaCache, SpecialColumn, TabularDataset,
};
use tempfile::NamedTempFile;

const TRANSACTIONS: &str = "\
Id,Date,District,Notes,PricePerUnit
1,2010-03-01,North,corner,1000
2,2010-03-04,North,,1500
3,2010-03-06,North,renovated,1200
4,2010-03-01,South,,100
5,2010-03-04,South,garden,500
6,2010-03-06,South,,200
7,,South,no date,300
";

fn csv_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(file: &NamedTempFile) -> TabularDataset {
    let config = PipelineConfig::default();
    let source = CsvSource::from_path(file.path(), &config).unwrap();
    let mut dataset = TabularDataset::new("transactions", source).with_sample_size(3);
    dataset.initialize().unwrap();

    assert_eq!(dataset.column_count(), 5);
    assert_eq!(dataset.row_count(), 7);
    assert_eq!(dataset.column_format(0).unwrap(), ColumnType::Number);
    assert_eq!(dataset.column_format(1).unwrap(), ColumnType::Date);
    assert_eq!(dataset.column_format(2).unwrap(), ColumnType::String);

    dataset.set_special_column(SpecialColumn::TransactionDate, 1).unwrap();
    dataset.set_special_column(SpecialColumn::PricePerUnit, 4).unwrap();
    dataset
        .set_active_columns(vec![false, true, true, false, true])
        .unwrap();
    dataset.load_data().unwrap();
    dataset
}

#[test]
fn csv_to_plot_events() {
    let file = csv_file(TRANSACTIONS);
    let dataset = load(&file);

    // Id and Notes were dropped: Date, District, PricePerUnit remain.
    assert_eq!(dataset.column_count(), 3);
    assert_eq!(dataset.special_column(SpecialColumn::TransactionDate), Some(0));
    assert_eq!(dataset.special_column(SpecialColumn::PricePerUnit), Some(2));
    assert_eq!(dataset.string_list(1).unwrap(), vec!["North", "South"]);
    assert_eq!(dataset.numeric_range(2).unwrap(), (100.0, 1500.0));
    assert!(dataset.date_range(0).unwrap().had_nulls);

    let records = project_transactions(&dataset, Some(1)).unwrap();
    assert_eq!(records.len(), 6);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let mut provider = PlotDataProvider::new(Some(1));
    provider.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    provider.recompute(records, dataset.column_format(1).unwrap());

    let events = events.borrow();
    assert_eq!(events.len(), 3);
    match &events[0] {
        PlotEvent::GroupingChanged {
            global_min,
            global_max,
            group_names,
            group_quantiles,
            ..
        } => {
            assert_eq!((*global_min, *global_max), (100.0, 1500.0));
            assert_eq!(group_names, &["North", "South"]);
            assert_eq!((group_quantiles[0].min, group_quantiles[0].max), (1000.0, 1500.0));
            assert_eq!((group_quantiles[1].min, group_quantiles[1].max), (100.0, 500.0));
        }
        other => panic!("unexpected first event {other:?}"),
    }
    match &events[1] {
        PlotEvent::BasicPlotChanged {
            bundle, regression, ..
        } => {
            assert_eq!(bundle.count, 6);
            assert!(matches!(regression, RegressionLine::Segment { .. }));
        }
        other => panic!("unexpected second event {other:?}"),
    }
}

#[test]
fn schema_cache_round_trips_through_disk() {
    let file = csv_file(TRANSACTIONS);
    let dataset = load(&file);

    let cache = SchemaCache::from_dataset(&dataset);
    let out = NamedTempFile::new().unwrap();
    std::fs::write(out.path(), cache.to_json().unwrap()).unwrap();

    let restored = SchemaCache::from_json(&std::fs::read_to_string(out.path()).unwrap()).unwrap();
    assert_eq!(restored, cache);
    assert_eq!(restored.row_count, 7);
    assert_eq!(restored.columns.len(), 3);
    assert_eq!(restored.columns[2].special_tag, Some(SpecialColumn::PricePerUnit));
    assert!(restored.validate_against(&dataset).is_ok());
}

#[test]
fn sample_preview_resolves_strings() {
    let file = csv_file(TRANSACTIONS);
    let config = PipelineConfig::default();
    let source = CsvSource::from_path(file.path(), &config).unwrap();
    let mut dataset = TabularDataset::new("preview", source).with_sample_size(2);
    dataset.initialize().unwrap();

    let mut sample = dataset.retrieve_sample_data();
    assert_eq!(sample.len(), 2);
    dataset.update_sample_data_strings(&mut sample);
    assert_eq!(sample[0][2].to_string(), "North");
    assert_eq!(sample[0][3].to_string(), "corner");
    assert_eq!(dataset.malformed_index_count(), 0);
}

#[test]
fn configured_grouping_column_survives_compaction() {
    let file = csv_file(TRANSACTIONS);
    let config = PipelineConfig {
        grouping_column: Some(2),
        ..PipelineConfig::default()
    };
    let source = CsvSource::from_path(file.path(), &config).unwrap();
    let mut dataset = TabularDataset::new("configured", source);
    dataset.initialize().unwrap();
    dataset.set_special_column(SpecialColumn::TransactionDate, 1).unwrap();
    dataset.set_special_column(SpecialColumn::PricePerUnit, 4).unwrap();

    let group_name = config.grouping_column_name(&dataset, None).unwrap();
    assert_eq!(group_name.as_deref(), Some("District"));

    dataset
        .set_active_columns(vec![false, true, true, false, true])
        .unwrap();
    dataset.load_data().unwrap();

    // District moved from index 2 to 1.
    let group_column = dataset
        .columns()
        .iter()
        .position(|c| Some(c.name.as_str()) == group_name.as_deref());
    assert_eq!(group_column, Some(1));

    let records = project_transactions(&dataset, group_column).unwrap();
    assert_eq!(records[0].grouping_key, GroupingKey::from("North"));

    let mut provider = PlotDataProvider::new(group_column).with_epoch(config.epoch);
    let events = provider.subscribe_channel();
    provider.recompute(records, dataset.column_format(1).unwrap());

    let grouping = events
        .try_iter()
        .find_map(|event| match event {
            PlotEvent::GroupingChanged {
                group_names,
                group_quantiles,
                ..
            } => Some((group_names, group_quantiles)),
            _ => None,
        })
        .unwrap();
    assert_eq!(grouping.0, vec!["North", "South"]);
    assert_eq!(grouping.1[0].count, 3);
    assert_eq!(grouping.1[1].count, 3);
}
