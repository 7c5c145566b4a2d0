/// Software rasterization pipeline: shared targets, depth testing,
/// shaders and the per-frame orchestration.
pub mod depth;
pub mod framebuffer;
pub mod rasterizer;
pub mod renderer;
pub mod shading;
pub mod texture;

pub use depth::{
    DepthBuffer, DepthBufferKind, DepthTest, FlatDepthBuffer, HierarchicalDepthBuffer, ScreenRect, UNOCCLUDED_DEPTH,
};
pub use framebuffer::{ColorBuffer, Rgba};
pub use rasterizer::{raster_triangle, RasterOptions};
pub use renderer::{RenderStats, SoftRenderer};
pub use shading::{LambertShader, Shader, ShadingConfig, SkyShader};
pub use texture::{LinearSampler, Texture};
