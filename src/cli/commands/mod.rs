mod balance;
mod check;
mod list;
mod missing;
mod parse;
mod sort;

pub use balance::cmd_balance;
pub use check::cmd_check;
pub use list::cmd_list;
pub use missing::cmd_missing;
pub use parse::cmd_parse;
pub use sort::cmd_sort;
