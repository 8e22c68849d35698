mod history;
mod intercept;
mod observer;
mod session;

pub use history::History;
pub use intercept::{ChangeIntercept, Resolution, RuleSource};
pub use observer::{ChangeAction, ObserverId, PartsChanged, PartsObserver};
pub use session::Configurator;
