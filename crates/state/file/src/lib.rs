mod store;

pub use store::FileStateStore;
