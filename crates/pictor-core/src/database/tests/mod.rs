// Database test modules
#[cfg(test)]
mod memory_tests;
