pub mod nasdaq_data_link;
pub mod reddit;
pub mod yahoo_finance;
