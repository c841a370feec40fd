pub mod action;
pub mod event;
pub mod route;
pub mod toast;

pub use action::Action;
pub use event::Event;
pub use route::Gate;
pub use route::Route;
pub use toast::Toast;
pub use toast::ToastKind;
