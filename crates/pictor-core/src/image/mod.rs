//! Image handling collaborators of the pipeline: loading uploads, applying
//! transformations and converting output formats.
pub mod codec;
pub mod input_loader;
pub mod output_converter;
pub mod transformation;

pub use input_loader::{ImageCrateLoader, InputLoader, InputLoaderManager};
pub use output_converter::{ImageCrateConverter, OutputConverter, OutputConverterManager, SupportedFormat};
pub use transformation::{Transformation, TransformationManager};

#[cfg(test)]
mod tests;
