//! Selective recomputation of dashboard charts.
//!
//! Each chart subscribes to the filter fields it reads. When the filter state
//! changes, the [`Dispatcher`] re-renders only the charts whose subscription
//! intersects the set of changed fields.

use crate::aggregate;
use crate::chart::{self, CategoryChartType, Figure};
use crate::loader::Dataset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A single input control of the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Mall,
    StartDate,
    EndDate,
    ChartType,
}

/// The current value of every input control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub mall: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub chart_type: CategoryChartType,
}

impl FilterState {
    /// First mall by appearance, the full date span and bar charts.
    pub fn defaults(dataset: &Dataset) -> Self {
        let (start_date, end_date) = dataset.date_span();
        FilterState {
            mall: dataset.default_mall().to_string(),
            start_date,
            end_date,
            chart_type: CategoryChartType::default(),
        }
    }

    /// Fields whose value differs from `previous`.
    pub fn changed_fields(&self, previous: &FilterState) -> BTreeSet<FilterField> {
        let mut changed = BTreeSet::new();
        if self.mall != previous.mall {
            changed.insert(FilterField::Mall);
        }
        if self.start_date != previous.start_date {
            changed.insert(FilterField::StartDate);
        }
        if self.end_date != previous.end_date {
            changed.insert(FilterField::EndDate);
        }
        if self.chart_type != previous.chart_type {
            changed.insert(FilterField::ChartType);
        }
        changed
    }
}

/// The four dashboard charts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartId {
    MonthlySales,
    Categories,
    AgeSpend,
    PaymentMethods,
}

impl ChartId {
    pub const ALL: [ChartId; 4] = [
        ChartId::MonthlySales,
        ChartId::Categories,
        ChartId::AgeSpend,
        ChartId::PaymentMethods,
    ];

    /// Identifier used for DOM elements and URL segments.
    pub fn as_str(self) -> &'static str {
        match self {
            ChartId::MonthlySales => "monthly-sales",
            ChartId::Categories => "categories",
            ChartId::AgeSpend => "age-spend",
            ChartId::PaymentMethods => "payment-methods",
        }
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown chart `{s}`"))
    }
}

/// Recomputes a chart from the base table and the current filter state.
pub type RenderFn = fn(&Dataset, &FilterState) -> Figure;

struct Subscription {
    inputs: BTreeSet<FilterField>,
    render: RenderFn,
}

/// Subscription map from charts to the filter fields they depend on.
pub struct Dispatcher {
    subscriptions: BTreeMap<ChartId, Subscription>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl Dispatcher {
    /// A dispatcher with no charts registered.
    pub fn new() -> Self {
        Dispatcher {
            subscriptions: BTreeMap::new(),
        }
    }

    /// The dashboard's four charts bound to exactly the inputs they read.
    pub fn standard() -> Self {
        use FilterField::*;

        let mut dispatcher = Self::new();
        dispatcher.register(
            ChartId::MonthlySales,
            [Mall, StartDate, EndDate],
            render_monthly_sales,
        );
        dispatcher.register(ChartId::Categories, [ChartType, Mall], render_categories);
        dispatcher.register(ChartId::AgeSpend, [Mall], render_age_spend);
        dispatcher.register(ChartId::PaymentMethods, [Mall], render_payment_methods);
        dispatcher
    }

    /// Binds `chart` to `inputs`, replacing any earlier registration.
    pub fn register(
        &mut self,
        chart: ChartId,
        inputs: impl IntoIterator<Item = FilterField>,
        render: RenderFn,
    ) {
        self.subscriptions.insert(
            chart,
            Subscription {
                inputs: inputs.into_iter().collect(),
                render,
            },
        );
    }

    /// Every registered chart with its dependency set.
    pub fn dependency_map(&self) -> BTreeMap<ChartId, Vec<FilterField>> {
        self.subscriptions
            .iter()
            .map(|(id, s)| (*id, s.inputs.iter().copied().collect()))
            .collect()
    }

    /// Charts that must be recomputed after `changed` fields were updated.
    pub fn affected(&self, changed: &BTreeSet<FilterField>) -> Vec<ChartId> {
        self.subscriptions
            .iter()
            .filter(|(_, s)| !s.inputs.is_disjoint(changed))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Re-renders only the charts affected by `changed`.
    pub fn dispatch(
        &self,
        dataset: &Dataset,
        state: &FilterState,
        changed: &BTreeSet<FilterField>,
    ) -> BTreeMap<ChartId, Figure> {
        let affected = self.affected(changed);
        log::debug!(
            "filter change {:?} recomputes {:?}",
            changed,
            affected
        );

        affected
            .into_iter()
            .filter_map(|id| self.render(id, dataset, state).map(|fig| (id, fig)))
            .collect()
    }

    /// Renders every registered chart, used for the first paint.
    pub fn render_all(&self, dataset: &Dataset, state: &FilterState) -> BTreeMap<ChartId, Figure> {
        self.subscriptions
            .iter()
            .map(|(id, s)| (*id, (s.render)(dataset, state)))
            .collect()
    }

    pub fn render(&self, chart: ChartId, dataset: &Dataset, state: &FilterState) -> Option<Figure> {
        self.subscriptions
            .get(&chart)
            .map(|s| (s.render)(dataset, state))
    }
}

fn render_monthly_sales(dataset: &Dataset, state: &FilterState) -> Figure {
    let rows = aggregate::monthly_revenue(dataset, &state.mall, state.start_date, state.end_date);
    chart::monthly_revenue_figure(&rows)
}

fn render_categories(dataset: &Dataset, state: &FilterState) -> Figure {
    let rows = aggregate::category_quantities(dataset, &state.mall);
    chart::category_figure(&rows, state.chart_type)
}

fn render_age_spend(dataset: &Dataset, state: &FilterState) -> Figure {
    let rows = aggregate::average_spend_by_age_gender(dataset, &state.mall);
    chart::age_spend_figure(&rows)
}

fn render_payment_methods(dataset: &Dataset, state: &FilterState) -> Figure {
    let rows = aggregate::payment_method_counts(dataset, &state.mall);
    chart::payment_figure(&rows)
}
