pub mod cache;
pub mod dispatch;
pub mod policy;
pub mod session;
pub mod types;

pub use cache::InputCache;
pub use dispatch::{DispatchMetrics, EventDispatcher};
pub use policy::{AckDecision, AckPolicy, SensorBitPolicy};
pub use session::SessionMonitor;
pub use types::MonitorConfig;
