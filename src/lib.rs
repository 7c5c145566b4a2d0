/// Soft Renderer - multi-threaded CPU triangle rasterizer
/// Lock-free shared targets with flat or hierarchical depth testing
pub mod camera;
pub mod config;
pub mod error;
pub mod parallel;
pub mod perf;
pub mod rendering;
pub mod scene;

pub use camera::{Camera, CameraController, Frustum};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use parallel::{parallel_for, try_parallel_for, TaskExecutor, TaskHandle};
pub use perf::{CounterSnapshot, FrameStats, FunctionCounters, PerfTimer, FUNCTION_COUNTERS};
pub use rendering::{
    ColorBuffer, DepthBuffer, DepthBufferKind, DepthTest, RenderStats, Rgba, Shader, ShadingConfig, SoftRenderer,
};
pub use scene::{Light, Mesh, Model, ModelTransform, Scene, Triangle, Vertex};
