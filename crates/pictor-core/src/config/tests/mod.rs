// Configuration test modules
#[cfg(test)]
mod config_tests;
