pub mod guard;
pub mod lifecycle;

pub use guard::PidLock;
pub use lifecycle::{shutdown_signal, Lifecycle, ShutdownHook, Signal};
