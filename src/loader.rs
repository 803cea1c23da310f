use crate::error::{LoadError, ParseError};
use crate::record::{Gender, Money, Transaction, parse_day_first_date};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns the input file must provide, by header name.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "shopping_mall",
    "invoice_date",
    "age",
    "gender",
    "category",
    "quantity",
    "price",
    "payment_method",
];

/// The immutable base table.
///
/// Built once at startup; every query borrows it read-only.
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<Transaction>,
    malls: Vec<String>,
    first_date: NaiveDate,
    last_date: NaiveDate,
}

impl Dataset {
    /// Wraps already-parsed transactions, computing the mall list and date span.
    ///
    /// # Errors
    /// * [`LoadError::Empty`] when `records` is empty
    pub fn new(records: Vec<Transaction>) -> Result<Self, LoadError> {
        let first = records.first().ok_or(LoadError::Empty)?;
        let mut first_date = first.invoice_date;
        let mut last_date = first.invoice_date;
        let mut malls: Vec<String> = Vec::new();

        for record in &records {
            first_date = first_date.min(record.invoice_date);
            last_date = last_date.max(record.invoice_date);
            if !malls.iter().any(|m| m == &record.mall) {
                malls.push(record.mall.clone());
            }
        }

        Ok(Dataset {
            records,
            malls,
            first_date,
            last_date,
        })
    }

    /// Load the dataset from a CSV file on disk
    ///
    /// # Examples
    /// ```no_run
    /// use mall_dashboard::loader::Dataset;
    ///
    /// match Dataset::from_path("data/sales.csv") {
    ///     Ok(ds) => println!("loaded {} transactions", ds.len()),
    ///     Err(e) => eprintln!("cannot start: {}", e),
    /// }
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;

        log::info!(
            "loaded {} transactions from {} ({} malls, {} to {})",
            dataset.len(),
            path.display(),
            dataset.malls.len(),
            dataset.first_date,
            dataset.last_date
        );
        Ok(dataset)
    }

    /// Parses CSV content with a header row.
    ///
    /// Required columns are checked before any row is read. The first bad
    /// row aborts the whole load; nothing is skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = Columns::locate(csv.headers()?)?;

        let mut records = Vec::new();
        for row in csv.records() {
            let row = row?;
            records.push(columns.parse_row(&row)?);
        }

        Self::new(records)
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    /// Distinct mall identifiers in order of first appearance.
    pub fn malls(&self) -> &[String] {
        &self.malls
    }

    pub fn default_mall(&self) -> &str {
        // Dataset::new guarantees at least one record, hence one mall.
        self.malls.first().map(String::as_str).unwrap_or_default()
    }

    /// Earliest and latest invoice date, inclusive.
    pub fn date_span(&self) -> (NaiveDate, NaiveDate) {
        (self.first_date, self.last_date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Positions of the required columns within a header row.
struct Columns {
    mall: usize,
    invoice_date: usize,
    age: usize,
    gender: usize,
    category: usize,
    quantity: usize,
    price: usize,
    payment_method: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or(LoadError::MissingColumn { column })
        };

        // Report the first missing column in declaration order.
        for column in REQUIRED_COLUMNS {
            find(column)?;
        }

        Ok(Columns {
            mall: find("shopping_mall")?,
            invoice_date: find("invoice_date")?,
            age: find("age")?,
            gender: find("gender")?,
            category: find("category")?,
            quantity: find("quantity")?,
            price: find("price")?,
            payment_method: find("payment_method")?,
        })
    }

    fn parse_row(&self, row: &StringRecord) -> Result<Transaction, ParseError> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let mall = field(self.mall);
        if mall.is_empty() {
            return Err(ParseError::EmptyField {
                line,
                column: "shopping_mall",
            });
        }

        let raw_date = field(self.invoice_date);
        let invoice_date =
            parse_day_first_date(raw_date).ok_or_else(|| ParseError::InvalidDate {
                line,
                value: raw_date.to_string(),
            })?;

        let number = |idx: usize, column: &'static str| {
            let raw = field(idx);
            raw.parse::<u32>()
                .map_err(|_| ParseError::InvalidNumber {
                    line,
                    column,
                    value: raw.to_string(),
                })
        };

        let raw_price = field(self.price);
        let price = Money::parse(raw_price).ok_or_else(|| ParseError::InvalidNumber {
            line,
            column: "price",
            value: raw_price.to_string(),
        })?;

        Ok(Transaction {
            mall: mall.to_string(),
            invoice_date,
            age: number(self.age, "age")?,
            gender: Gender::parse(field(self.gender)),
            category: field(self.category).to_string(),
            quantity: number(self.quantity, "quantity")?,
            price,
            payment_method: field(self.payment_method).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "invoice_no,customer_id,gender,age,category,quantity,price,payment_method,invoice_date,shopping_mall";

    fn load(body: &str) -> Result<Dataset, LoadError> {
        Dataset::from_reader(format!("{HEADER}\n{body}").as_bytes())
    }

    #[test]
    fn loads_rows_in_file_order() {
        let ds = load(
            "I1,C1,Female,25,Clothing,2,40,Cash,05/01/2024,Kanyon\n\
             I2,C2,Male,30,Shoes,1,20.5,Credit Card,10/02/2024,Metrocity\n\
             I3,C3,Female,41,Books,3,15.15,Cash,01/01/2024,Kanyon\n",
        )
        .unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.malls(), ["Kanyon", "Metrocity"]);
        assert_eq!(ds.default_mall(), "Kanyon");
        assert_eq!(
            ds.date_span(),
            (
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
            )
        );
        let second = &ds.records()[1];
        assert_eq!(second.price, Money::from_cents(2050));
        assert_eq!(second.gender, Gender::from("Male"));
        assert_eq!(second.payment_method, "Credit Card");
    }

    #[test]
    fn column_order_does_not_matter() {
        let csv = "shopping_mall,invoice_date,age,gender,category,quantity,price,payment_method\n\
                   MallA,05/01/2024,25,F,Clothing,2,40,Cash\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.records()[0].category, "Clothing");
    }

    #[test]
    fn missing_price_column_is_reported_by_name() {
        let csv = "shopping_mall,invoice_date,age,gender,category,quantity,payment_method\n\
                   MallA,05/01/2024,25,F,Clothing,2,Cash\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "price" }));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn bad_date_rejects_whole_load() {
        let err = load(
            "I1,C1,Female,25,Clothing,2,40,Cash,05/01/2024,Kanyon\n\
             I2,C2,Male,30,Shoes,1,20,Cash,not-a-date,Kanyon\n",
        )
        .unwrap_err();
        match err {
            LoadError::Parse(ParseError::InvalidDate { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_number_names_the_column() {
        let err = load("I1,C1,Female,25,Clothing,-2,40,Cash,05/01/2024,Kanyon\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse(ParseError::InvalidNumber {
                column: "quantity",
                ..
            })
        ));
    }

    #[test]
    fn empty_mall_is_rejected() {
        let err = load(
            "I1,C1,Female,25,Clothing,2,40,Cash,05/01/2024,Kanyon\n\
             I2,C2,Male,30,Shoes,1,20,Cash,10/02/2024,  \n",
        )
        .unwrap_err();
        match err {
            LoadError::Parse(ParseError::EmptyField { line, column }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "shopping_mall");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn header_names_are_trimmed() {
        let csv = " shopping_mall , invoice_date,age ,gender,category,quantity, price ,payment_method\n\
                   MallA,05/01/2024,25,F,Clothing,2,40,Cash\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.malls(), ["MallA"]);
        assert_eq!(ds.records()[0].price, Money::from_cents(4000));
        assert_eq!(ds.records()[0].age, 25);
    }

    #[test]
    fn prices_keep_every_fractional_digit() {
        let ds = load(
            "I1,C1,Female,25,Clothing,2,40.125,Cash,05/01/2024,Kanyon\n\
             I2,C2,Male,30,Shoes,1,0.875,Cash,10/01/2024,Kanyon\n\
             I3,C3,Male,31,Shoes,1,1.1,Cash,11/01/2024,Kanyon\n",
        )
        .unwrap();

        assert_eq!(ds.records()[0].price, Money::new(40125, 3));
        let total: Money = ds.records().iter().map(|t| t.price).sum();
        assert_eq!(total, Money::new(421, 1));
        assert_eq!(total.to_string(), "42.10");
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = load("").unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = load("I1,C1,Female,25\n").unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Dataset::from_path("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
