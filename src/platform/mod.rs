// Platform collaborators consumed by the keep-alive controller
// Each concern is a trait at the seam plus one concrete implementation

pub mod asset;
pub mod interruption;
pub mod session;
pub mod timer;

pub use asset::{AssetResolver, BundleAssetResolver, BundleRegistrar, PluginRegistrar};
pub use interruption::{InterruptionBus, InterruptionCenter, InterruptionEvent, InterruptionHandler, SubscriptionId};
pub use session::{AudioSession, CategoryOptions, ProcessAudioSession, SessionCategory, SessionMode, SessionPolicy};
pub use timer::{ManualTimer, PeriodicTimer, TickCallback, TimerHandle, TokioTimer};
