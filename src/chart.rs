//! Chart descriptions for the dashboard.
//!
//! Renderers here never aggregate; they only map a derived table onto a
//! [`Figure`], which serialises to the `{ data, layout }` shape Plotly.js
//! accepts directly.

use crate::aggregate::{AgeGenderSpend, CategoryQuantity, MonthlyRevenue, PaymentCount};
use crate::record::Gender;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The visual kinds a figure can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Scatter,
}

/// Encoding selected by the chart-type toggle for the category chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryChartType {
    #[default]
    Bar,
    Pie,
}

impl CategoryChartType {
    pub const ALL: [CategoryChartType; 2] = [CategoryChartType::Bar, CategoryChartType::Pie];

    pub fn label(self) -> &'static str {
        match self {
            CategoryChartType::Bar => "Bars",
            CategoryChartType::Pie => "Pie",
        }
    }
}

impl fmt::Display for CategoryChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryChartType::Bar => f.write_str("bar"),
            CategoryChartType::Pie => f.write_str("pie"),
        }
    }
}

/// A single plotted value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Datum {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Text(_) => None,
            Datum::Int(v) => Some(*v as f64),
            Datum::Float(v) => Some(*v),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Datum::Text(s) => s.clone(),
            Datum::Int(v) => v.to_string(),
            Datum::Float(v) => format!("{v:.2}"),
        }
    }
}

/// One data series, tagged with its Plotly trace `type`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    /// Points or a line through them.
    Scatter {
        /// Legend entry; omitted for single-series charts.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Plotly draw mode, e.g. `lines+markers` or `markers`.
        mode: &'static str,
        /// Horizontal coordinates.
        x: Vec<Datum>,
        /// Vertical coordinates, paired with `x` by index.
        y: Vec<Datum>,
    },
    /// Vertical bars, one per `x` value.
    Bar {
        /// Legend entry; omitted for single-series charts.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Bar labels.
        x: Vec<Datum>,
        /// Bar heights.
        y: Vec<Datum>,
    },
    /// Slices of a whole.
    Pie {
        /// Slice names.
        labels: Vec<String>,
        /// Slice sizes, paired with `labels` by index.
        values: Vec<Datum>,
    },
}

impl Trace {
    /// The plotted pairs: (x, y) for cartesian traces, (label, value) for pies.
    pub fn points(&self) -> Vec<(Datum, Datum)> {
        match self {
            Trace::Scatter { x, y, .. } | Trace::Bar { x, y, .. } => {
                x.iter().cloned().zip(y.iter().cloned()).collect()
            }
            Trace::Pie { labels, values } => labels
                .iter()
                .map(|l| Datum::Text(l.clone()))
                .zip(values.iter().cloned())
                .collect(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Trace::Scatter { name, .. } | Trace::Bar { name, .. } => name.as_deref(),
            Trace::Pie { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Title {
    /// Text shown above a chart, beside an axis or over a legend.
    pub text: String,
}

impl Title {
    fn new(text: &str) -> Self {
        Title {
            text: text.to_string(),
        }
    }
}

/// Settings for one axis of a cartesian chart.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Axis {
    /// Axis caption.
    pub title: Title,
    /// Plotly axis type such as `date`; inferred by Plotly when absent.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<&'static str>,
    /// Draggable overview strip under a date axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
    /// Quick-range buttons above a date axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeselector: Option<RangeSelector>,
}

impl Axis {
    fn titled(text: &str) -> Self {
        Axis {
            title: Title::new(text),
            ..Axis::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeSelector {
    /// Buttons in display order.
    pub buttons: Vec<RangeButton>,
}

/// A quick-range button on a date axis; `count: None` selects everything.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeButton {
    /// Number of `step` units to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Button caption, e.g. `6M`.
    pub label: &'static str,
    /// Unit of `count`: `month`, or `all` for the full range.
    pub step: &'static str,
    /// `backward` counts back from the latest date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stepmode: Option<&'static str>,
}

impl RangeButton {
    fn months_back(count: u32, label: &'static str) -> Self {
        RangeButton {
            count: Some(count),
            label,
            step: "month",
            stepmode: Some("backward"),
        }
    }

    fn all() -> Self {
        RangeButton {
            count: None,
            label: "All",
            step: "all",
            stepmode: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Legend {
    /// Heading over the legend entries.
    pub title: Title,
}

/// Everything about a figure except its data.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    /// Chart title.
    pub title: Title,
    /// Horizontal axis; pies have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    /// Vertical axis; pies have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    /// Legend settings, present when traces are grouped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

/// A complete chart description.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    /// Visual kind, used by the SVG renderer to pick a drawing routine.
    pub kind: ChartKind,
    /// Series to plot.
    pub data: Vec<Trace>,
    /// Titles, axes and legend.
    pub layout: Layout,
}

impl Figure {
    pub fn title(&self) -> &str {
        &self.layout.title.text
    }

    /// All plotted pairs across traces, in trace order.
    pub fn points(&self) -> Vec<(Datum, Datum)> {
        self.data.iter().flat_map(Trace::points).collect()
    }
}

/// Line chart with markers over a date axis, with a range slider and
/// 3M / 6M / 1Y / All quick-range buttons.
pub fn monthly_revenue_figure(rows: &[MonthlyRevenue]) -> Figure {
    let trace = Trace::Scatter {
        name: None,
        mode: "lines+markers",
        x: rows.iter().map(|r| Datum::Text(r.month.to_string())).collect(),
        y: rows.iter().map(|r| Datum::Float(r.total.as_f64())).collect(),
    };

    let xaxis = Axis {
        axis_type: Some("date"),
        rangeslider: Some(RangeSlider { visible: true }),
        rangeselector: Some(RangeSelector {
            buttons: vec![
                RangeButton::months_back(3, "3M"),
                RangeButton::months_back(6, "6M"),
                RangeButton::months_back(12, "1Y"),
                RangeButton::all(),
            ],
        }),
        ..Axis::titled("Month")
    };

    Figure {
        kind: ChartKind::Line,
        data: vec![trace],
        layout: Layout {
            title: Title::new("Monthly Sales"),
            xaxis: Some(xaxis),
            yaxis: Some(Axis::titled("Revenue")),
            legend: None,
        },
    }
}

/// Quantity per category as bars or as pie slices; the pairs are identical.
pub fn category_figure(rows: &[CategoryQuantity], chart_type: CategoryChartType) -> Figure {
    let labels = rows.iter().map(|r| r.category.clone());
    let values = rows.iter().map(|r| Datum::Int(r.quantity as i64));

    match chart_type {
        CategoryChartType::Bar => Figure {
            kind: ChartKind::Bar,
            data: vec![Trace::Bar {
                name: None,
                x: labels.map(Datum::Text).collect(),
                y: values.collect(),
            }],
            layout: Layout {
                title: Title::new("Top-Selling Categories"),
                xaxis: Some(Axis::titled("Category")),
                yaxis: Some(Axis::titled("Quantity")),
                legend: None,
            },
        },
        CategoryChartType::Pie => Figure {
            kind: ChartKind::Pie,
            data: vec![Trace::Pie {
                labels: labels.collect(),
                values: values.collect(),
            }],
            layout: Layout {
                title: Title::new("Share by Category"),
                ..Layout::default()
            },
        },
    }
}

/// Scatter of age against mean spend, one coloured trace per gender.
pub fn age_spend_figure(rows: &[AgeGenderSpend]) -> Figure {
    let mut by_gender: BTreeMap<&Gender, (Vec<Datum>, Vec<Datum>)> = BTreeMap::new();
    for row in rows {
        let (x, y) = by_gender.entry(&row.gender).or_default();
        x.push(Datum::Int(i64::from(row.age)));
        y.push(Datum::Float(row.mean_price));
    }

    let data = by_gender
        .into_iter()
        .map(|(gender, (x, y))| Trace::Scatter {
            name: Some(gender.to_string()),
            mode: "markers",
            x,
            y,
        })
        .collect();

    Figure {
        kind: ChartKind::Scatter,
        data,
        layout: Layout {
            title: Title::new("Age vs Average Spend"),
            xaxis: Some(Axis::titled("Age")),
            yaxis: Some(Axis::titled("Average Spend")),
            legend: Some(Legend {
                title: Title::new("Gender"),
            }),
        },
    }
}

pub fn payment_figure(rows: &[PaymentCount]) -> Figure {
    Figure {
        kind: ChartKind::Bar,
        data: vec![Trace::Bar {
            name: None,
            x: rows.iter().map(|r| Datum::Text(r.method.clone())).collect(),
            y: rows.iter().map(|r| Datum::Int(r.count as i64)).collect(),
        }],
        layout: Layout {
            title: Title::new("Payment Method Usage"),
            xaxis: Some(Axis::titled("Payment Method")),
            yaxis: Some(Axis::titled("Count")),
            legend: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Money, Month};
    use serde_json::json;

    fn categories() -> Vec<CategoryQuantity> {
        vec![
            CategoryQuantity {
                category: "Books".to_string(),
                quantity: 7,
            },
            CategoryQuantity {
                category: "Clothing".to_string(),
                quantity: 3,
            },
        ]
    }

    #[test]
    fn bar_and_pie_share_the_same_pairs() {
        let bar = category_figure(&categories(), CategoryChartType::Bar);
        let pie = category_figure(&categories(), CategoryChartType::Pie);

        assert_eq!(bar.kind, ChartKind::Bar);
        assert_eq!(pie.kind, ChartKind::Pie);
        assert_eq!(bar.points(), pie.points());
        assert_ne!(bar.title(), pie.title());
    }

    #[test]
    fn monthly_figure_has_range_controls() {
        let fig = monthly_revenue_figure(&[MonthlyRevenue {
            month: Month::new(2024, 1),
            total: Money::from_cents(4000),
        }]);
        let value = serde_json::to_value(&fig).unwrap();

        assert_eq!(value["data"][0]["type"], "scatter");
        assert_eq!(value["data"][0]["mode"], "lines+markers");
        assert_eq!(value["data"][0]["x"], json!(["2024-01"]));
        assert_eq!(value["data"][0]["y"], json!([40.0]));
        assert_eq!(value["layout"]["xaxis"]["rangeslider"]["visible"], true);

        let buttons = value["layout"]["xaxis"]["rangeselector"]["buttons"]
            .as_array()
            .unwrap();
        let counts: Vec<_> = buttons.iter().map(|b| b["count"].clone()).collect();
        assert_eq!(counts, [json!(3), json!(6), json!(12), json!(null)]);
        assert_eq!(buttons[3]["step"], "all");
    }

    #[test]
    fn empty_tables_render_empty_figures() {
        let fig = monthly_revenue_figure(&[]);
        assert!(fig.points().is_empty());
        assert_eq!(fig.data.len(), 1);

        let scatter = age_spend_figure(&[]);
        assert!(scatter.data.is_empty());

        let pie = category_figure(&[], CategoryChartType::Pie);
        assert!(pie.points().is_empty());
    }

    #[test]
    fn scatter_groups_traces_by_gender() {
        let rows = vec![
            AgeGenderSpend {
                age: 25,
                gender: Gender::from("Male"),
                mean_price: 10.0,
            },
            AgeGenderSpend {
                age: 30,
                gender: Gender::from("Female"),
                mean_price: 20.0,
            },
            AgeGenderSpend {
                age: 35,
                gender: Gender::from("Male"),
                mean_price: 30.0,
            },
        ];
        let fig = age_spend_figure(&rows);
        let names: Vec<_> = fig.data.iter().map(|t| t.name().unwrap()).collect();
        assert_eq!(names, ["Female", "Male"]);
        assert_eq!(fig.data[1].points().len(), 2);
    }

    #[test]
    fn pie_serialises_labels_and_values() {
        let value =
            serde_json::to_value(category_figure(&categories(), CategoryChartType::Pie)).unwrap();
        assert_eq!(value["data"][0]["type"], "pie");
        assert_eq!(value["data"][0]["labels"], json!(["Books", "Clothing"]));
        assert_eq!(value["data"][0]["values"], json!([7, 3]));
        assert!(value["layout"].get("xaxis").is_none());
    }

    #[test]
    fn chart_type_wire_names() {
        assert_eq!(serde_json::to_value(CategoryChartType::Pie).unwrap(), "pie");
        let parsed: CategoryChartType = serde_json::from_str("\"bar\"").unwrap();
        assert_eq!(parsed, CategoryChartType::Bar);
    }
}
