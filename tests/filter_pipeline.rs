//! End-to-end filter pipeline tests.
//!
//! These run against the software surface, which mirrors the GPU fragment
//! programs pixel for pixel, so the pipeline's laws can be checked without a
//! GPU adapter.

use iris::filter::{Filter, FilterKind, FilterSelector};
use iris::frame::{ImageFrame, PixelFormat, SourceImage};
use iris::render::{RenderError, RenderSurface, SoftwareSurface};
use iris::shader::{FilterNode, ShaderRegistry};

fn solid_source(width: u32, height: u32, rgba: [u8; 4]) -> SourceImage {
    let mut data = Vec::with_capacity((width * height) as usize * 4);
    for _ in 0..width * height {
        data.extend_from_slice(&rgba);
    }
    SourceImage::new(
        "test:solid",
        ImageFrame::from_data(width, height, PixelFormat::Rgba, data),
    )
}

fn gradient_source(width: u32, height: u32) -> SourceImage {
    let mut data = Vec::with_capacity((width * height) as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) * 5 % 256) as u8,
                255,
            ]);
        }
    }
    SourceImage::new(
        "test:gradient",
        ImageFrame::from_data(width, height, PixelFormat::Rgba, data),
    )
}

/// Binds, renders, and flattens in one step.
fn render_flat(
    surface: &mut SoftwareSurface,
    registry: &ShaderRegistry,
    filter: Filter,
    source: &SourceImage,
) -> ImageFrame {
    let node = FilterNode::bind(filter, registry, source.width(), source.height()).unwrap();
    surface.render(node.as_ref(), source).unwrap();
    surface.flatten().unwrap()
}

#[test]
fn none_filter_reproduces_source_pixels() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = gradient_source(31, 17);

    let out = render_flat(&mut surface, &registry, Filter::None, &source);
    assert_eq!(out.data, source.frame.data);

    // An RGB source passes through as its RGBA normalization.
    let rgb = SourceImage::new(
        "test:rgb",
        ImageFrame::from_data(2, 1, PixelFormat::Rgb, vec![10, 20, 30, 40, 50, 60]),
    );
    let out = render_flat(&mut surface, &registry, Filter::None, &rgb);
    assert_eq!(out.data, rgb.frame.to_rgba().data);
}

#[test]
fn rerendering_the_same_pair_is_deterministic() {
    let registry = ShaderRegistry::with_builtin();
    let source = gradient_source(24, 24);

    let mut surface = SoftwareSurface::new();
    let first = render_flat(&mut surface, &registry, Filter::Sepia, &source);
    let second = render_flat(&mut surface, &registry, Filter::Sepia, &source);
    assert_eq!(first.data, second.data);

    // A fresh surface produces the same bytes as well.
    let mut other = SoftwareSurface::new();
    let third = render_flat(&mut other, &registry, Filter::Sepia, &source);
    assert_eq!(first.data, third.data);
}

#[test]
fn switching_filters_and_returning_reproduces_the_first_output() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = gradient_source(20, 15);

    let first = render_flat(&mut surface, &registry, Filter::Sepia, &source);
    render_flat(&mut surface, &registry, Filter::Blur, &source);
    render_flat(&mut surface, &registry, Filter::contrast(), &source);
    render_flat(&mut surface, &registry, Filter::BlackAndWhite, &source);
    let again = render_flat(&mut surface, &registry, Filter::Sepia, &source);

    assert_eq!(first.data, again.data);
}

#[test]
fn flatten_repeats_the_displayed_frame() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = gradient_source(12, 12);

    // The preview window consumes the flattened frame, so the saved artifact
    // is whatever flatten returns; repeated flattens of one render must not
    // diverge.
    let node = FilterNode::bind(Filter::contrast(), &registry, 12, 12).unwrap();
    surface.render(node.as_ref(), &source).unwrap();
    let displayed = surface.flatten().unwrap();
    let saved = surface.flatten().unwrap();
    assert_eq!(displayed.data, saved.data);
}

#[test]
fn flatten_before_any_render_is_no_frame() {
    let mut surface = SoftwareSurface::new();
    assert!(matches!(surface.flatten(), Err(RenderError::NoFrame)));
}

#[test]
fn contrast_scenario_on_solid_rgb() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = solid_source(8, 8, [200, 100, 50, 255]);

    let out = render_flat(&mut surface, &registry, Filter::contrast(), &source);

    // (c/255 - 0.5) * 1.5 + 0.5, clamped and scaled back to 8 bit.
    assert_eq!(&out.data[0..4], &[236, 86, 11, 255]);
    // Solid input stays solid.
    for px in out.data.chunks_exact(4) {
        assert_eq!(px, &[236, 86, 11, 255]);
    }
}

#[test]
fn black_and_white_scenario_averages_channels() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = solid_source(4, 4, [90, 150, 210, 255]);

    let out = render_flat(&mut surface, &registry, Filter::BlackAndWhite, &source);
    assert_eq!(&out.data[0..4], &[150, 150, 150, 255]);
}

#[test]
fn unrecognized_identifier_shows_the_source_unfiltered() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();
    let source = gradient_source(10, 10);

    let mut selector = FilterSelector::new();
    selector.select("polaroid-86");
    assert_eq!(selector.active(), Filter::None);

    let out = render_flat(&mut surface, &registry, selector.active(), &source);
    assert_eq!(out.data, source.frame.data);
}

#[test]
fn selection_survives_loading_a_new_photo() {
    let mut selector = FilterSelector::new();
    selector.select("sepia");

    // Swapping the photo is not a selection event.
    let _first = gradient_source(6, 6);
    let _second = solid_source(6, 6, [1, 2, 3, 255]);
    assert_eq!(selector.active(), Filter::Sepia);
}

#[test]
fn broken_blur_degrades_to_identity_and_spares_the_rest() {
    let mut registry = ShaderRegistry::with_builtin();
    registry.register(FilterKind::Blur, "blur", "this is not glsl");

    let mut surface = SoftwareSurface::new();
    let source = gradient_source(16, 16);

    // Selecting blur now fails to bind; the caller falls back to identity.
    let err = FilterNode::bind(Filter::Blur, &registry, 16, 16).unwrap_err();
    assert!(matches!(err, RenderError::Unavailable(FilterKind::Blur)));

    surface.render(None, &source).unwrap();
    let fallback = surface.flatten().unwrap();
    assert_eq!(fallback.data, source.frame.data);

    // Every other filter keeps rendering correctly.
    let bw = render_flat(&mut surface, &registry, Filter::BlackAndWhite, &source);
    assert_ne!(bw.data, source.frame.data);
    let sepia = render_flat(&mut surface, &registry, Filter::Sepia, &source);
    assert_ne!(sepia.data, source.frame.data);
}

#[test]
fn blur_averages_alpha_instead_of_forcing_opaque() {
    let registry = ShaderRegistry::with_builtin();
    let mut surface = SoftwareSurface::new();

    // The blur program divides all four channels by the sample count, so a
    // translucent photo stays translucent. Sepia and black & white force
    // alpha to 1.0 instead. This asymmetry is intended behavior.
    let translucent = solid_source(16, 16, [60, 120, 180, 128]);

    let blurred = render_flat(&mut surface, &registry, Filter::Blur, &translucent);
    assert_eq!(&blurred.data[0..4], &[60, 120, 180, 128]);

    let sepia = render_flat(&mut surface, &registry, Filter::Sepia, &translucent);
    assert_eq!(sepia.data[3], 255);
}
