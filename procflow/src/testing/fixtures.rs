//! Ready-made operations and pipelines for tests and benchmarks.

use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::core::{SlotRef, Value};
use crate::errors::PipelineError;
use crate::params::Parameter;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::stages::{FnOperation, Operation};

/// Builds an RGB image whose red channel ramps from left to right.
#[must_use]
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let span = width.saturating_sub(1).max(1);
    let img = RgbImage::from_fn(width, height, |x, y| {
        let level = u8::try_from(x * 255 / span).unwrap_or(u8::MAX);
        let blue = u8::try_from(y % 256).unwrap_or(u8::MAX);
        Rgb([level, level / 2, blue])
    });
    DynamicImage::ImageRgb8(img)
}

/// An operation producing a gradient image of the given width and height.
#[must_use]
pub fn load_operation() -> Arc<dyn Operation> {
    Arc::new(FnOperation::new("load_gradient", 2, |args| {
        let width = args[0].as_int().context("width must be an integer")?;
        let height = args[1].as_int().context("height must be an integer")?;
        let width = u32::try_from(width).context("width out of range")?;
        let height = u32::try_from(height).context("height out of range")?;
        Ok(vec![Value::from(gradient_image(width, height))])
    }))
}

/// An operation converting its image argument to grayscale.
#[must_use]
pub fn grayscale_operation() -> Arc<dyn Operation> {
    Arc::new(FnOperation::new("grayscale", 1, |args| {
        let img = args[0].as_image().context("expected an image")?;
        Ok(vec![Value::from(DynamicImage::ImageLuma8(img.to_luma8()))])
    }))
}

/// An operation binarizing an image against a threshold level.
///
/// Pixels at or above the level become white, the rest black.
#[must_use]
pub fn threshold_operation() -> Arc<dyn Operation> {
    Arc::new(FnOperation::new("threshold", 2, |args| {
        let img = args[0].as_image().context("expected an image")?;
        let level = args[1].as_f64().context("threshold must be numeric")?;
        let gray = img.to_luma8();
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if f64::from(gray.get_pixel(x, y).0[0]) >= level {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        Ok(vec![Value::from(DynamicImage::ImageLuma8(binary))])
    }))
}

/// An operation adding its two numeric arguments.
#[must_use]
pub fn add_operation() -> Arc<dyn Operation> {
    Arc::new(FnOperation::new("add", 2, |args| {
        let a = args[0].as_f64().context("left operand must be numeric")?;
        let b = args[1].as_f64().context("right operand must be numeric")?;
        Ok(vec![Value::Double(a + b)])
    }))
}

/// Builds `load -> gray -> threshold` over a `width` x `height` gradient.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be assembled.
pub fn image_pipeline(width: i64, height: i64, level: f64) -> Result<Pipeline, PipelineError> {
    let mut builder = PipelineBuilder::new("image");
    let load = builder.stage(
        "load",
        load_operation(),
        vec![
            Parameter::int().named("width").with_value(width),
            Parameter::int().named("height").with_value(height),
        ],
    )?;
    let gray = builder.stage(
        "gray",
        grayscale_operation(),
        vec![Parameter::image().named("source").bound_to(load.output(0)?)],
    )?;
    builder.stage(
        "threshold",
        threshold_operation(),
        vec![
            Parameter::image().named("source").bound_to(gray.output(0)?),
            Parameter::slider(0.0, 255.0).named("level").with_value(level),
        ],
    )?;
    builder.build()
}

/// Builds a chain of `length` adders, each adding one to its predecessor.
///
/// # Errors
///
/// Returns an error if `length` is zero.
pub fn adder_chain(length: usize) -> Result<Pipeline, PipelineError> {
    let mut builder = PipelineBuilder::new("adders");
    let mut previous: Option<SlotRef> = None;
    for index in 0..length {
        let left = match previous.take() {
            Some(slot_ref) => Parameter::double().bound_to(slot_ref),
            None => Parameter::double().with_value(0.0),
        };
        let handle = builder.stage(
            format!("add_{index}"),
            add_operation(),
            vec![left, Parameter::double().with_value(1.0)],
        )?;
        previous = Some(handle.output(0)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_image() {
        let img = gradient_image(4, 2);
        assert_eq!((img.width(), img.height()), (4, 2));
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0[0], 0);
        assert_eq!(rgb.get_pixel(3, 0).0[0], 255);
    }

    #[test]
    fn test_adder_chain() {
        let mut pipeline = adder_chain(3).unwrap();
        pipeline.run().unwrap();
        assert_eq!(pipeline.output("add_2", 0).unwrap().get(), Value::Double(3.0));
    }

    #[test]
    fn test_threshold_rejects_non_image() {
        let err = threshold_operation()
            .invoke(&[Value::Int(1), Value::Double(2.0)])
            .unwrap_err();
        assert_eq!(err.to_string(), "expected an image");
    }
}
