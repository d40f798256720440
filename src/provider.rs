use std::collections::BTreeMap;
use std::sync::mpsc;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::model::ColumnType;
use crate::data::projection::TransactionRecord;
use crate::stats::{Quantiles, RegressionLine};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Parallel coordinate arrays for scatter and histogram plots.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlotBundle {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub count: usize,
}

/// Results pushed to subscribers after a recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlotEvent {
    BasicPlotChanged {
        bundle: PlotBundle,
        quantiles: Quantiles,
        regression: RegressionLine,
    },
    HistogramChanged {
        bundle: PlotBundle,
        quantiles: Quantiles,
    },
    GroupingChanged {
        global_min: f64,
        global_max: f64,
        group_names: Vec<String>,
        /// Same order as `group_names`.
        group_quantiles: Vec<Quantiles>,
        global_quantiles: Quantiles,
    },
}

enum Subscriber {
    Callback(Box<dyn FnMut(&PlotEvent)>),
    Channel(mpsc::Sender<PlotEvent>),
}

impl Subscriber {
    /// Deliver `event`; `false` once the subscriber can no longer receive.
    fn deliver(&mut self, event: &PlotEvent) -> bool {
        match self {
            Subscriber::Callback(callback) => {
                callback(event);
                true
            }
            Subscriber::Channel(tx) => tx.send(event.clone()).is_ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlotDataProvider
// ---------------------------------------------------------------------------

/// Owns the working record set and turns it into plot notifications.
///
/// Every entry point runs to completion and then delivers its events, once
/// each, to every subscriber. Nothing is returned; the provider is not
/// synchronised, so concurrent callers must serialise access themselves.
pub struct PlotDataProvider {
    /// Working record set. Replaced wholesale, never shared.
    records: Option<Vec<TransactionRecord>>,
    grouping_column: Option<usize>,
    quantiles: Quantiles,
    epoch: NaiveDate,
    subscribers: Vec<Subscriber>,
}

impl PlotDataProvider {
    pub fn new(grouping_column: Option<usize>) -> Self {
        PlotDataProvider {
            records: None,
            grouping_column,
            quantiles: Quantiles::default(),
            epoch: NaiveDate::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.grouping_column).with_epoch(config.epoch)
    }

    /// Day zero of the regression x axis.
    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&PlotEvent) + 'static,
    {
        self.subscribers.push(Subscriber::Callback(Box::new(subscriber)));
    }

    /// Subscribe through a channel. The subscription ends when the receiver
    /// is dropped.
    pub fn subscribe_channel(&mut self) -> mpsc::Receiver<PlotEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(Subscriber::Channel(tx));
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn grouping_column(&self) -> Option<usize> {
        self.grouping_column
    }

    /// Global quantiles of the last full recompute.
    pub fn quantiles(&self) -> &Quantiles {
        &self.quantiles
    }

    pub fn records(&self) -> &[TransactionRecord] {
        self.records.as_deref().unwrap_or_default()
    }

    // -- Entry points --------------------------------------------------------

    /// Install `records` and recompute everything: global quantiles, grouping
    /// on the current grouping column, and the basic plot with its trend
    /// line.
    pub fn recompute(&mut self, records: Vec<TransactionRecord>, grouping_type: ColumnType) {
        self.set_new_records(records);
        self.quantiles = Quantiles::compute(&self.prices());

        let mut events = Vec::new();
        events.extend(self.group_data(grouping_type));
        events.extend(self.basic_data());
        self.publish(events);
    }

    /// Repartition by `grouping_column`, optionally installing a new record
    /// set first. `None` selects no column: nothing is computed or sent.
    pub fn recompute_group_data(
        &mut self,
        records: Option<Vec<TransactionRecord>>,
        grouping_column: Option<usize>,
        column_type: ColumnType,
    ) {
        if let Some(records) = records {
            self.set_new_records(records);
            self.quantiles = Quantiles::compute(&self.prices());
        }
        self.grouping_column = grouping_column;

        let events: Vec<PlotEvent> = self.group_data(column_type).into_iter().collect();
        self.publish(events);
    }

    /// Rebuild the scatter/histogram bundle and the trend line.
    pub fn compute_basic_data(&mut self) {
        let events = self.basic_data();
        self.publish(events);
    }

    // -- Computation ---------------------------------------------------------

    fn set_new_records(&mut self, records: Vec<TransactionRecord>) {
        debug!("Installing {} transaction records", records.len());
        self.records = Some(records);
    }

    fn prices(&self) -> Vec<f64> {
        self.records().iter().map(|r| r.price_per_unit).collect()
    }

    fn group_data(&self, column_type: ColumnType) -> Option<PlotEvent> {
        self.grouping_column?;

        let mut group_names = Vec::new();
        let mut group_quantiles = Vec::new();

        // Only text keys are partitioned; other column types report the
        // global figures without groups.
        if column_type == ColumnType::String {
            let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for record in self.records() {
                groups
                    .entry(record.grouping_key.to_string())
                    .or_default()
                    .push(record.price_per_unit);
            }
            for (name, prices) in groups {
                group_quantiles.push(Quantiles::compute(&prices));
                group_names.push(name);
            }
        } else {
            debug!("Grouping by {column_type} columns is not supported");
        }

        Some(PlotEvent::GroupingChanged {
            global_min: self.quantiles.min,
            global_max: self.quantiles.max,
            group_names,
            group_quantiles,
            global_quantiles: self.quantiles,
        })
    }

    fn basic_data(&mut self) -> Vec<PlotEvent> {
        let records = self.records.as_deref().unwrap_or_default();
        if records.is_empty() {
            return vec![PlotEvent::BasicPlotChanged {
                bundle: PlotBundle::default(),
                quantiles: self.quantiles,
                regression: RegressionLine::Empty,
            }];
        }

        let x: Vec<f64> = records
            .iter()
            .map(|r| (r.date - self.epoch).num_days() as f64)
            .collect();
        let y: Vec<f64> = records.iter().map(|r| r.price_per_unit).collect();

        let regression = RegressionLine::through(&x, &y);
        if regression == RegressionLine::Undefined {
            warn!(
                "Trend line undefined: all {} transactions share one date",
                records.len()
            );
        }

        self.quantiles.min_x = x.iter().copied().fold(f64::INFINITY, f64::min);
        self.quantiles.max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let bundle = PlotBundle {
            count: x.len(),
            x,
            y,
        };
        vec![
            PlotEvent::BasicPlotChanged {
                bundle: bundle.clone(),
                quantiles: self.quantiles,
                regression,
            },
            PlotEvent::HistogramChanged {
                bundle,
                quantiles: self.quantiles,
            },
        ]
    }

    fn publish(&mut self, events: Vec<PlotEvent>) {
        let before = self.subscribers.len();
        self.subscribers
            .retain_mut(|subscriber| events.iter().all(|event| subscriber.deliver(event)));
        if self.subscribers.len() < before {
            debug!("Dropped {} disconnected subscribers", before - self.subscribers.len());
        }
    }
}
