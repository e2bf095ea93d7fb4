mod common;

mod build_tests;
mod clean_tests;
mod list_tests;
mod tree_tests;
