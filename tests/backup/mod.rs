mod rsync_simulator;
mod test_doubles;

pub use test_doubles::LocalCopyRunner;
