pub mod fifo;
pub mod input;
pub mod movement;
pub mod munch;
pub mod tax_row;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use fifo::Fifo;
pub use input::{read_csv, read_json, DecodeError, MovementInput};
pub use movement::{Metadata, Movement};
pub use munch::{Munch, Term};
pub use tax_row::{group_tax_rows, TaxRow, TaxRows};
pub use warnings::Warning;
