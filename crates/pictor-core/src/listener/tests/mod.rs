#[cfg(test)]
mod operations_tests;
