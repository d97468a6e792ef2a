use super::movement::{Metadata, Movement};
use crate::money::Money;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

pub const LOT_COLUMN: &str = "Lot";
pub const TX_COLUMN: &str = "Tx";
pub const QTY_COLUMN: &str = "Qty";
pub const COST_COLUMN: &str = "Cost";
pub const DATE_COLUMN: &str = "Date";
pub const FACTOR_COLUMN: &str = "Factor";

/// A recognised CSV column
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Columns read by [`read_csv`]. Any other non-empty column becomes metadata.
pub const COLUMNS: [Column; 6] = [
    Column {
        name: LOT_COLUMN,
        required: false,
        description: "Lot id, preferred over Tx when set",
    },
    Column {
        name: TX_COLUMN,
        required: false,
        description: "Transaction id (defaults to sh<Qty>)",
    },
    Column {
        name: QTY_COLUMN,
        required: false,
        description: "Signed whole quantity: positive buys, negative sells, empty is 0",
    },
    Column {
        name: COST_COLUMN,
        required: true,
        description: "Per-unit price, non-negative decimal",
    },
    Column {
        name: DATE_COLUMN,
        required: true,
        description: "DD-Mon-YY, DD-Mon-YYYY, YYYY-MM-DD or YYYY-MM-DDThh:mm:ss",
    },
    Column {
        name: FACTOR_COLUMN,
        required: false,
        description: "Valuation multiplier (default 1)",
    },
];

fn is_known_column(name: &str) -> bool {
    COLUMNS.iter().any(|column| column.name == name)
}

/// Upper bound on the summed absolute quantity of one input.
/// Together with [`MAX_PRICE`] and [`MAX_FACTOR`] this keeps every
/// balance, valuation and profit total inside `i64` and `Decimal` range.
pub const MAX_VOLUME: u64 = 1_000_000_000_000_000;
pub const MAX_PRICE: Decimal = dec!(10000000000);
pub const MAX_FACTOR: Decimal = dec!(1000);

/// Accepted date formats, tried in order
const DATE_FORMATS: [&str; 3] = ["%d-%b-%y", "%d-%b-%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Row numbers are 1-based and count data rows only.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot convert amount '{value}' in row {row}: {content}")]
    InvalidAmount {
        row: usize,
        value: String,
        content: String,
    },
    #[error("negative price {price} in row {row}")]
    NegativePrice { row: usize, price: Decimal },
    #[error("invalid quantity '{value}' in row {row}")]
    InvalidQuantity { row: usize, value: String },
    #[error("invalid date '{value}' in row {row}")]
    InvalidDate { row: usize, value: String },
    #[error("invalid factor '{value}' in row {row}")]
    InvalidFactor { row: usize, value: String },
    #[error("missing '{column}' column in row {row}")]
    MissingColumn { row: usize, column: &'static str },
    #[error("price {price} in row {row} is above {max}", max = MAX_PRICE)]
    PriceOutOfRange { row: usize, price: Decimal },
    #[error("factor {factor} in row {row} is outside \u{b1}{max}", max = MAX_FACTOR)]
    FactorOutOfRange { row: usize, factor: Decimal },
    #[error("quantity {quantity} in row {row} takes total volume past {max}", max = MAX_VOLUME)]
    VolumeExceeded { row: usize, quantity: i64 },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Input root for movement JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovementInput {
    pub movements: Vec<MovementRecord>,
}

/// One movement as supplied in JSON input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovementRecord {
    /// Transaction or lot id. Defaults to `sh<quantity>` when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Signed quantity: positive acquires, negative disposes, zero is ignored
    #[serde(default)]
    pub quantity: i64,
    /// Per-unit price, must not be negative
    #[schemars(with = "f64")]
    pub price: Decimal,
    /// DD-Mon-YY, DD-Mon-YYYY, YYYY-MM-DD or YYYY-MM-DDThh:mm:ss
    pub date: String,
    /// Valuation multiplier, defaults to 1
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub factor: Option<Decimal>,
    /// Opaque extra fields passed through to the output
    #[serde(default)]
    pub metadata: Metadata,
}

impl MovementRecord {
    fn into_movement(self, row: usize) -> Result<Movement, DecodeError> {
        let price = Money::new(self.price);
        if price.is_negative() {
            return Err(DecodeError::NegativePrice {
                row,
                price: self.price,
            });
        }
        if self.price > MAX_PRICE {
            return Err(DecodeError::PriceOutOfRange {
                row,
                price: self.price,
            });
        }
        let factor = self.factor.unwrap_or(Decimal::ONE);
        if factor.abs() > MAX_FACTOR {
            return Err(DecodeError::FactorOutOfRange { row, factor });
        }
        let date = parse_date(&self.date).ok_or_else(|| DecodeError::InvalidDate {
            row,
            value: self.date.clone(),
        })?;
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| default_id(self.quantity));

        Ok(Movement::new(id, self.quantity, price, date)
            .with_factor(factor)
            .with_metadata(self.metadata))
    }

    /// Builds a record from a CSV row keyed by header name
    fn from_csv_row(row: usize, mut fields: BTreeMap<String, String>) -> Result<Self, DecodeError> {
        let content = format!("{:?}", fields);
        let mut take = |column: &str| fields.remove(column).filter(|v| !v.is_empty());

        let id = take(LOT_COLUMN).or_else(|| take(TX_COLUMN));
        let quantity = match take(QTY_COLUMN) {
            None => 0,
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| DecodeError::InvalidQuantity { row, value })?,
        };
        let price = match take(COST_COLUMN) {
            None => {
                return Err(DecodeError::MissingColumn {
                    row,
                    column: COST_COLUMN,
                })
            }
            Some(value) => {
                Decimal::from_str(&value).map_err(|_| DecodeError::InvalidAmount {
                    row,
                    value,
                    content,
                })?
            }
        };
        let date = take(DATE_COLUMN).ok_or(DecodeError::MissingColumn {
            row,
            column: DATE_COLUMN,
        })?;
        let factor = take(FACTOR_COLUMN)
            .map(|value| {
                Decimal::from_str(&value).map_err(|_| DecodeError::InvalidFactor { row, value })
            })
            .transpose()?;

        let metadata = fields
            .into_iter()
            .filter(|(k, v)| !v.is_empty() && !is_known_column(k))
            .collect();

        Ok(MovementRecord {
            id,
            quantity,
            price,
            date,
            factor,
            metadata,
        })
    }
}

/// Running total of absolute quantity, bounded by [`MAX_VOLUME`]
#[derive(Debug, Default)]
struct Volume(u64);

impl Volume {
    fn admit(&mut self, row: usize, movement: &Movement) -> Result<(), DecodeError> {
        self.0 = self
            .0
            .checked_add(movement.size())
            .filter(|total| *total <= MAX_VOLUME)
            .ok_or(DecodeError::VolumeExceeded {
                row,
                quantity: movement.quantity,
            })?;
        Ok(())
    }
}

/// Id given to movements without a `Lot` or `Tx`
pub fn default_id(quantity: i64) -> String {
    format!("sh{}", quantity)
}

/// Parse a date that may be day-month-year, ISO date-only or ISO datetime.
/// Date-only values are taken as midnight.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        })
}

/// Read movements from CSV, keeping input order
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Movement>, DecodeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut movements = Vec::new();
    let mut volume = Volume::default();
    for (index, result) in rdr.deserialize::<BTreeMap<String, String>>().enumerate() {
        let row = index + 1;
        let movement = MovementRecord::from_csv_row(row, result?)?.into_movement(row)?;
        volume.admit(row, &movement)?;
        log::trace!("Decoded row {}: {}", row, movement);
        movements.push(movement);
    }
    Ok(movements)
}

/// Read movements from JSON, keeping input order
pub fn read_json<R: Read>(reader: R) -> Result<Vec<Movement>, DecodeError> {
    let input: MovementInput = serde_json::from_reader(reader)?;
    let mut volume = Volume::default();
    input
        .movements
        .into_iter()
        .enumerate()
        .map(|(index, record)| -> Result<Movement, DecodeError> {
            let movement = record.into_movement(index + 1)?;
            volume.admit(index + 1, &movement)?;
            log::trace!("Decoded movement {}: {}", index + 1, movement);
            Ok(movement)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn parse_csv() {
        let csv_data = "Lot,Tx,Qty,Cost,Date,Account
L1,,100,10.50,15-Jan-21,ira
,T2,-40,12.00,03-Mar-2022,
,,-60,11,2022-06-01,
,,,9.99,2022-06-02,";

        let movements = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(movements.len(), 4);

        assert_eq!(movements[0].id, "L1");
        assert_eq!(movements[0].quantity, 100);
        assert_eq!(movements[0].price, Money::new(dec!(10.50)));
        assert_eq!(movements[0].date, date(2021, 1, 15));
        assert_eq!(movements[0].factor, Decimal::ONE);
        assert_eq!(movements[0].metadata.get("Account").map(String::as_str), Some("ira"));

        assert_eq!(movements[1].id, "T2");
        assert_eq!(movements[1].date, date(2022, 3, 3));
        assert!(movements[1].metadata.is_empty());

        assert_eq!(movements[2].id, "sh-60");
        assert_eq!(movements[2].date, date(2022, 6, 1));

        // empty quantity is an inert movement
        assert_eq!(movements[3].quantity, 0);
        assert_eq!(movements[3].id, "sh0");
    }

    #[test]
    fn csv_keeps_input_order() {
        let csv_data = "Qty,Cost,Date
1,1,2022-06-02
1,1,2022-06-01";
        let movements = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(movements[0].date, date(2022, 6, 2));
        assert_eq!(movements[1].date, date(2022, 6, 1));
    }

    #[test]
    fn csv_factor_column() {
        let csv_data = "Tx,Qty,Cost,Date,Factor
opt,2,1.25,2022-01-01,100";
        let movements = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(movements[0].factor, dec!(100));
        assert_eq!(movements[0].value(), Money::new(dec!(250)));
    }

    #[test]
    fn bad_amount_reports_row_content() {
        let csv_data = "Tx,Qty,Cost,Date
a,1,1,2022-01-01
b,1,twelve,2022-01-02";
        let err = read_csv(csv_data.as_bytes()).unwrap_err();
        match &err {
            DecodeError::InvalidAmount {
                row,
                value,
                content,
            } => {
                assert_eq!(*row, 2);
                assert_eq!(value, "twelve");
                assert!(content.contains("\"Tx\": \"b\""));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("cannot convert amount 'twelve' in row 2"));
    }

    #[test]
    fn negative_price_rejected() {
        let csv_data = "Qty,Cost,Date
1,-1,2022-01-01";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::NegativePrice { row: 1, .. })
        ));
    }

    #[test]
    fn bad_quantity_and_date() {
        let csv_data = "Qty,Cost,Date
1.5,1,2022-01-01";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::InvalidQuantity { row: 1, .. })
        ));

        let csv_data = "Qty,Cost,Date
1,1,01/02/2022";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::InvalidDate { row: 1, .. })
        ));
    }

    #[test]
    fn missing_columns() {
        let csv_data = "Qty,Date
1,2022-01-01";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::MissingColumn { column: COST_COLUMN, .. })
        ));
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("15-Jan-21"), Some(date(2021, 1, 15)));
        assert_eq!(parse_date("15-jan-2021"), Some(date(2021, 1, 15)));
        assert_eq!(parse_date("2021-01-15"), Some(date(2021, 1, 15)));
        assert_eq!(
            parse_date("2021-01-15T10:30:00"),
            date(2021, 1, 15).date().and_hms_opt(10, 30, 0)
        );
        assert_eq!(
            parse_date("2021-01-15 10:30:00"),
            date(2021, 1, 15).date().and_hms_opt(10, 30, 0)
        );
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn parse_json() {
        let json_data = r#"{
            "movements": [
                { "id": "A", "quantity": 10, "price": "1.00", "date": "2020-01-01" },
                { "quantity": -10, "price": 1.5, "date": "2021-02-04", "factor": 2,
                  "metadata": { "broker": "x" } }
            ]
        }"#;

        let movements = read_json(json_data.as_bytes()).unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].id, "A");
        assert_eq!(movements[0].price, Money::new(dec!(1)));
        assert_eq!(movements[1].id, "sh-10");
        assert_eq!(movements[1].price, Money::new(dec!(1.5)));
        assert_eq!(movements[1].factor, dec!(2));
        assert_eq!(movements[1].date, date(2021, 2, 4));
        assert_eq!(movements[1].metadata.get("broker").map(String::as_str), Some("x"));
    }

    #[test]
    fn json_negative_price_rejected() {
        let json_data = r#"{ "movements": [ { "quantity": 1, "price": -2, "date": "2020-01-01" } ] }"#;
        assert!(matches!(
            read_json(json_data.as_bytes()),
            Err(DecodeError::NegativePrice { row: 1, .. })
        ));
    }

    #[test]
    fn total_volume_is_bounded() {
        let half = MAX_VOLUME / 2;
        let csv_data = format!("Qty,Cost,Date\n{},1,2022-01-01\n{},1,2022-01-02\n", half, half);
        assert_eq!(read_csv(csv_data.as_bytes()).unwrap().len(), 2);

        // a sale counts towards volume as much as a purchase
        let csv_data = format!(
            "Qty,Cost,Date\n{},1,2022-01-01\n-{},1,2022-01-02\n-1,1,2022-01-03\n",
            half, half
        );
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::VolumeExceeded { row: 3, quantity: -1 })
        ));

        let csv_data = format!("Qty,Cost,Date\n{},1,2022-01-01\n", i64::MAX);
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::VolumeExceeded { row: 1, .. })
        ));

        let csv_data = format!("Qty,Cost,Date\n{},1,2022-01-01\n", i64::MIN);
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::VolumeExceeded { row: 1, .. })
        ));
    }

    #[test]
    fn json_volume_is_bounded() {
        let json_data = format!(
            r#"{{ "movements": [
                {{ "quantity": {}, "price": 1, "date": "2020-01-01" }},
                {{ "quantity": {}, "price": 1, "date": "2020-01-02" }}
            ] }}"#,
            i64::MAX / 2 + 1,
            i64::MAX / 2 + 1
        );
        assert!(matches!(
            read_json(json_data.as_bytes()),
            Err(DecodeError::VolumeExceeded { row: 1, .. })
        ));
    }

    #[test]
    fn largest_accepted_input_stays_in_range() {
        let max = MAX_VOLUME / 2;
        let csv_data = format!(
            "Qty,Cost,Date,Factor\n{},{},2022-01-01,{}\n-{},{},2023-01-02,-{}\n",
            max, MAX_PRICE, MAX_FACTOR, max, MAX_PRICE, MAX_FACTOR
        );
        let movements = read_csv(csv_data.as_bytes()).unwrap();
        let fifo = crate::core::Fifo::new(&movements);
        assert_eq!(fifo.stock(), 0);
        assert_eq!(fifo.profit_and_loss(), Money::ZERO);
        assert_eq!(
            fifo.profit_and_loss_factored(),
            Money::new(Decimal::from(MAX_VOLUME) * MAX_PRICE * MAX_FACTOR)
        );

        let csv_data = format!(
            "Qty,Cost,Date,Factor\n{},{},2022-01-01,{}\n",
            MAX_VOLUME, MAX_PRICE, MAX_FACTOR
        );
        let fifo = crate::core::Fifo::new(&read_csv(csv_data.as_bytes()).unwrap());
        assert_eq!(fifo.stock(), MAX_VOLUME as i64);
        assert_eq!(fifo.valuation(), Money::new(Decimal::from(MAX_VOLUME) * MAX_PRICE));
        assert_eq!(
            fifo.valuation_factored(),
            Money::new(Decimal::from(MAX_VOLUME) * MAX_PRICE * MAX_FACTOR)
        );
    }

    #[test]
    fn price_and_factor_are_bounded() {
        let csv_data = "Qty,Cost,Date
1,100000000000,2022-01-01";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::PriceOutOfRange { row: 1, .. })
        ));

        let csv_data = "Qty,Cost,Date,Factor
1,1,2022-01-01,-1001";
        assert!(matches!(
            read_csv(csv_data.as_bytes()),
            Err(DecodeError::FactorOutOfRange { row: 1, .. })
        ));
    }

    #[test]
    fn metadata_excludes_recognised_columns() {
        let csv_data = "Lot,Tx,Qty,Cost,Date,Factor,Note
L,T,1,1,2022-01-01,1,hi";
        let movements = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(movements[0].metadata.len(), 1);
        assert_eq!(movements[0].metadata.get("Note").map(String::as_str), Some("hi"));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            read_json("{".as_bytes()),
            Err(DecodeError::Json(_))
        ));
    }
}
