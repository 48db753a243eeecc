pub mod utils;

mod views;
