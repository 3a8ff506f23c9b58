//! Session-persisted display state.

pub mod view;

pub use view::ViewState;
