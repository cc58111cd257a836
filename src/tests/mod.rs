pub mod utils;

mod scheduling_tests;
