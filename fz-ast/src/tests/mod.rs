//! Unit tests for the parsed-tree contract

mod test_builder;
mod test_span;
