pub mod book_key;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod navigation;
pub mod page_image;
pub mod preload;
pub mod session;
pub mod smooth_scroll;
pub mod spread;
pub mod surface;
pub mod view;
pub mod virtualizer;
pub mod visible;
pub mod zoom;

pub use book_key::BookKey;
pub use navigation::{JumpHandle, NavigationCommand};
pub use session::{ViewerCommand, ViewerEvent, ViewerSession, ViewportSnapshot};
pub use surface::{MemorySurface, ScrollBehavior, ScrollSurface};
pub use view::{ComicView, ComicViewProps, ViewportConfig};
