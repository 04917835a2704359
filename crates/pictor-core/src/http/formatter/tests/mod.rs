#[cfg(test)]
mod xml_tests;
