mod cell;
mod table_row;

pub use cell::{ArrayCell, Cell};
pub use table_row::TableRow;
