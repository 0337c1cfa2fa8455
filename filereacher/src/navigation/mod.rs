mod controller;
pub mod history;
pub mod stack;

pub use controller::{
    ASCEND, Lister, Listing, ListingRequest, NavState, NavigationController, NavigationError,
};
pub use history::{History, HistoryEntry, SessionHistory};
pub use stack::{Breadcrumb, PathStack};
