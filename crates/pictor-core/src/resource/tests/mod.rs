#[cfg(test)]
mod info_resources_tests;
#[cfg(test)]
mod pipeline;
