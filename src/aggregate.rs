//! Derived tables over the base table.
//!
//! Every query scopes the dataset to one mall first; only the monthly revenue
//! series additionally applies the date range. Nothing here can fail: a
//! filter that matches no rows yields an empty table.

use crate::loader::Dataset;
use crate::record::{Gender, Money, Month, Transaction};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: Month,
    pub total: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryQuantity {
    pub category: String,
    pub quantity: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgeGenderSpend {
    pub age: u32,
    pub gender: Gender,
    pub mean_price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentCount {
    pub method: String,
    pub count: u64,
}

/// Rows belonging to `mall`.
pub fn filter_by_mall<'a>(
    dataset: &'a Dataset,
    mall: &'a str,
) -> impl Iterator<Item = &'a Transaction> + 'a {
    dataset.records().iter().filter(move |t| t.mall == mall)
}

/// Total price per calendar month for `mall` within `[start, end]`.
///
/// Months without sales that fall between the first and last matching month
/// are reported with a zero total so the series has no holes. Returns an
/// empty series when nothing matches, including when `start > end`.
pub fn monthly_revenue(
    dataset: &Dataset,
    mall: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<MonthlyRevenue> {
    let mut totals: BTreeMap<Month, Money> = BTreeMap::new();
    for t in filter_by_mall(dataset, mall)
        .filter(|t| t.invoice_date >= start && t.invoice_date <= end)
    {
        let entry = totals.entry(Month::of(t.invoice_date)).or_default();
        *entry = *entry + t.price;
    }

    let (Some(&first), Some(&last)) = (totals.keys().next(), totals.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::with_capacity(totals.len());
    let mut month = first;
    while month <= last {
        series.push(MonthlyRevenue {
            month,
            total: totals.get(&month).copied().unwrap_or(Money::ZERO),
        });
        month = month.succ();
    }
    series
}

/// Quantity sold per category for `mall`, ordered by category name.
pub fn category_quantities(dataset: &Dataset, mall: &str) -> Vec<CategoryQuantity> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for t in filter_by_mall(dataset, mall) {
        *totals.entry(t.category.as_str()).or_default() += u64::from(t.quantity);
    }

    totals
        .into_iter()
        .map(|(category, quantity)| CategoryQuantity {
            category: category.to_string(),
            quantity,
        })
        .collect()
}

/// Mean price per (age, gender) pair for `mall`, ordered by age then gender.
///
/// Only groups that contain at least one row are produced, so the mean is
/// always defined; an unmatched mall gives an empty table rather than NaN.
pub fn average_spend_by_age_gender(dataset: &Dataset, mall: &str) -> Vec<AgeGenderSpend> {
    let mut groups: BTreeMap<(u32, &Gender), (Money, u64)> = BTreeMap::new();
    for t in filter_by_mall(dataset, mall) {
        let (sum, count) = groups.entry((t.age, &t.gender)).or_default();
        *sum = *sum + t.price;
        *count += 1;
    }

    groups
        .into_iter()
        .map(|((age, gender), (sum, count))| AgeGenderSpend {
            age,
            gender: gender.clone(),
            mean_price: sum.as_f64() / count as f64,
        })
        .collect()
}

/// Number of transactions per payment method for `mall`.
///
/// Most used first; ties are broken by method name.
pub fn payment_method_counts(dataset: &Dataset, mall: &str) -> Vec<PaymentCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for t in filter_by_mall(dataset, mall) {
        *counts.entry(t.payment_method.as_str()).or_default() += 1;
    }

    let mut rows: Vec<PaymentCount> = counts
        .into_iter()
        .map(|(method, count)| PaymentCount {
            method: method.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps the name order from the map for equal counts.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(
        mall: &str,
        day: NaiveDate,
        age: u32,
        gender: Gender,
        category: &str,
        quantity: u32,
        cents: i64,
        method: &str,
    ) -> Transaction {
        Transaction {
            mall: mall.to_string(),
            invoice_date: day,
            age,
            gender,
            category: category.to_string(),
            quantity,
            price: Money::from_cents(cents),
            payment_method: method.to_string(),
        }
    }

    fn worked_example() -> Dataset {
        Dataset::new(vec![
            tx("MallA", date(2024, 1, 5), 25, Gender::from("Female"), "Clothing", 2, 4000, "Cash"),
            tx("MallA", date(2024, 2, 10), 30, Gender::from("Male"), "Clothing", 1, 2000, "Card"),
        ])
        .unwrap()
    }

    #[test]
    fn worked_example_monthly() {
        let ds = worked_example();
        let (start, end) = ds.date_span();
        assert_eq!(
            monthly_revenue(&ds, "MallA", start, end),
            vec![
                MonthlyRevenue {
                    month: Month::new(2024, 1),
                    total: Money::from_cents(4000)
                },
                MonthlyRevenue {
                    month: Month::new(2024, 2),
                    total: Money::from_cents(2000)
                },
            ]
        );
    }

    #[test]
    fn worked_example_categories_spend_and_payments() {
        let ds = worked_example();
        assert_eq!(
            category_quantities(&ds, "MallA"),
            vec![CategoryQuantity {
                category: "Clothing".to_string(),
                quantity: 3
            }]
        );
        assert_eq!(
            average_spend_by_age_gender(&ds, "MallA"),
            vec![
                AgeGenderSpend {
                    age: 25,
                    gender: Gender::from("Female"),
                    mean_price: 40.0
                },
                AgeGenderSpend {
                    age: 30,
                    gender: Gender::from("Male"),
                    mean_price: 20.0
                },
            ]
        );
        let payments = payment_method_counts(&ds, "MallA");
        assert_eq!(payments.len(), 2);
        assert!(payments.iter().all(|p| p.count == 1));
        assert_eq!(payments[0].method, "Card");
        assert_eq!(payments[1].method, "Cash");
    }

    #[test]
    fn gap_months_are_zero_filled() {
        let ds = Dataset::new(vec![
            tx("A", date(2023, 11, 3), 20, Gender::from("Male"), "Toys", 1, 1000, "Cash"),
            tx("A", date(2024, 2, 1), 20, Gender::from("Male"), "Toys", 1, 500, "Cash"),
        ])
        .unwrap();
        let series = monthly_revenue(&ds, "A", date(2023, 1, 1), date(2024, 12, 31));
        let months: Vec<String> = series.iter().map(|r| r.month.to_string()).collect();
        assert_eq!(months, ["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(series[1].total, Money::ZERO);
        assert_eq!(series[2].total, Money::ZERO);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = worked_example();
        let series = monthly_revenue(&ds, "MallA", date(2024, 1, 5), date(2024, 1, 5));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total, Money::from_cents(4000));
    }

    #[test]
    fn empty_range_yields_empty_series() {
        let ds = worked_example();
        assert!(monthly_revenue(&ds, "MallA", date(2024, 1, 20), date(2024, 1, 20)).is_empty());
        assert!(monthly_revenue(&ds, "MallA", date(2024, 3, 1), date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn unknown_mall_yields_empty_tables() {
        let ds = worked_example();
        let (start, end) = ds.date_span();
        assert!(monthly_revenue(&ds, "Nowhere", start, end).is_empty());
        assert!(category_quantities(&ds, "Nowhere").is_empty());
        assert!(average_spend_by_age_gender(&ds, "Nowhere").is_empty());
        assert!(payment_method_counts(&ds, "Nowhere").is_empty());
    }

    #[test]
    fn mean_spend_averages_within_group() {
        let ds = Dataset::new(vec![
            tx("A", date(2024, 1, 1), 40, Gender::from("Female"), "Books", 1, 1000, "Cash"),
            tx("A", date(2024, 1, 2), 40, Gender::from("Female"), "Books", 1, 2500, "Cash"),
            tx("A", date(2024, 1, 3), 40, Gender::from("Male"), "Books", 1, 700, "Cash"),
        ])
        .unwrap();
        let spend = average_spend_by_age_gender(&ds, "A");
        assert_eq!(spend.len(), 2);
        assert_eq!(spend[0].gender, Gender::from("Female"));
        assert!((spend[0].mean_price - 17.5).abs() < 1e-9);
        assert!((spend[1].mean_price - 7.0).abs() < 1e-9);
    }

    #[test]
    fn payments_sorted_by_count_descending() {
        let ds = Dataset::new(vec![
            tx("A", date(2024, 1, 1), 1, Gender::from("Male"), "X", 1, 1, "Cash"),
            tx("A", date(2024, 1, 1), 1, Gender::from("Male"), "X", 1, 1, "Debit Card"),
            tx("A", date(2024, 1, 1), 1, Gender::from("Male"), "X", 1, 1, "Debit Card"),
            tx("B", date(2024, 1, 1), 1, Gender::from("Male"), "X", 1, 1, "Cash"),
        ])
        .unwrap();
        let counts = payment_method_counts(&ds, "A");
        assert_eq!(counts[0].method, "Debit Card");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].method, "Cash");
        assert_eq!(counts[1].count, 1);
    }
}
