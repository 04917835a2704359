// Image handling test modules
#[cfg(test)]
mod input_loader_tests;
