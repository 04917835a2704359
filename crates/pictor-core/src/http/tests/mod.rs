#[cfg(test)]
mod response_formatter_tests;
#[cfg(test)]
mod router_tests;
